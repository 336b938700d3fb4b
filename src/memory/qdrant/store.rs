// src/memory/qdrant/store.rs

//! Implements VectorStore for Qdrant over its REST API. Each record is one
//! point: the vector plus a payload carrying the turn text and metadata, so
//! the text/vector pair is upserted atomically.

use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ConvoError, Result};
use crate::memory::traits::VectorStore;
use crate::memory::types::{ConversationTurn, EmbeddingRecord, RecalledTurn, SentimentLabel};

const SCROLL_PAGE_SIZE: usize = 256;

pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    collection: String,
    embedding_dim: usize,
}

impl QdrantVectorStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        collection: impl Into<String>,
        embedding_dim: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            collection: collection.into(),
            embedding_dim,
        }
    }

    /// Ensures the collection exists with the configured vector size.
    /// Safe to call multiple times; only creates if missing.
    pub async fn ensure_collection(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant unreachable: {e}")))?;
        if resp.status().is_success() {
            return Ok(());
        }

        let req_body = json!({
            "vectors": {
                "size": self.embedding_dim,
                "distance": "Cosine"
            }
        });

        let resp = self
            .client
            .put(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant unreachable: {e}")))?;

        let status = resp.status();
        let err_body = resp.text().await.unwrap_or_default();
        if status.is_success() || status.as_u16() == 409 || err_body.contains("already exists") {
            Ok(())
        } else {
            Err(ConvoError::StoreUnavailable(format!(
                "failed to create qdrant collection: {err_body}"
            )))
        }
    }

    fn point_payload(turn: &ConversationTurn) -> Value {
        json!({
            "user_text": turn.user_text,
            "agent_text": turn.agent_text,
            "content": turn.content(),
            "sentiment": turn.sentiment.as_str(),
            "score": turn.score,
            "timestamp": turn.timestamp.timestamp_millis(),
        })
    }

    fn point_to_record(point: &Value) -> Result<EmbeddingRecord> {
        let id = point
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                ConvoError::StoreUnavailable("qdrant point missing uuid id".to_string())
            })?;

        let payload = point.get("payload").cloned().unwrap_or(json!({}));

        let sentiment = payload
            .get("sentiment")
            .and_then(|v| v.as_str())
            .and_then(|s| SentimentLabel::from_str(s).ok())
            .ok_or_else(|| {
                ConvoError::StoreUnavailable("qdrant payload missing sentiment".to_string())
            })?;

        let embedding = point
            .get("vector")
            .and_then(|vec| vec.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|val| val.as_f64().map(|f| f as f32))
                    .collect::<Vec<f32>>()
            })
            .unwrap_or_default();

        Ok(EmbeddingRecord {
            turn: ConversationTurn {
                id,
                user_text: payload
                    .get("user_text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                agent_text: payload
                    .get("agent_text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                sentiment,
                score: payload
                    .get("score")
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default() as f32,
                timestamp: payload
                    .get("timestamp")
                    .and_then(|v| v.as_i64())
                    .map(millis_to_datetime)
                    .unwrap_or_else(Utc::now),
            },
            embedding,
        })
    }
}

// Helper for chrono timestamp conversion (no deprecation warnings)
fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()> {
        let url = format!("{}/collections/{}/points", self.base_url, self.collection);

        let point = json!({
            "id": record.turn.id.to_string(),
            "vector": record.embedding,
            "payload": Self::point_payload(&record.turn),
        });

        // Each record is a single-point upsert
        let req_body = json!({ "points": [ point ] });

        let resp = self
            .client
            .put(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant save error: {e}")))?;

        if !resp.status().is_success() {
            return Err(ConvoError::StoreUnavailable(format!(
                "qdrant save failed: {}",
                resp.text().await.unwrap_or_default()
            )));
        }

        Ok(())
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RecalledTurn>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let req_body = json!({
            "vector": embedding,
            "limit": k,
            "with_payload": true,
            "with_vector": true,
        });

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant search error: {e}")))?;

        if !resp.status().is_success() {
            return Err(ConvoError::StoreUnavailable(format!(
                "qdrant search failed: {}",
                resp.text().await.unwrap_or_default()
            )));
        }

        let resp_json: Value = resp
            .json()
            .await
            .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant search error: {e}")))?;

        let mut hits = Vec::new();
        if let Some(points) = resp_json.get("result").and_then(|r| r.as_array()) {
            for point in points {
                let similarity = point
                    .get("score")
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default() as f32;
                hits.push(RecalledTurn {
                    record: Self::point_to_record(point)?,
                    similarity,
                });
            }
        }

        // Qdrant returns score order but leaves ties unspecified; re-sort so
        // identical queries against an unchanged collection are stable.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.turn().id.cmp(&b.turn().id))
        });

        Ok(hits)
    }

    async fn get_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let url = format!(
            "{}/collections/{}/points/scroll",
            self.base_url, self.collection
        );

        let mut records = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut req_body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
                "with_vector": true,
            });
            if let Some(off) = &offset {
                req_body["offset"] = off.clone();
            }

            let resp = self
                .client
                .post(&url)
                .json(&req_body)
                .send()
                .await
                .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant scroll error: {e}")))?;

            if !resp.status().is_success() {
                return Err(ConvoError::StoreUnavailable(format!(
                    "qdrant scroll failed: {}",
                    resp.text().await.unwrap_or_default()
                )));
            }

            let resp_json: Value = resp
                .json()
                .await
                .map_err(|e| ConvoError::StoreUnavailable(format!("qdrant scroll error: {e}")))?;

            let result = resp_json.get("result").cloned().unwrap_or(json!({}));
            if let Some(points) = result.get("points").and_then(|p| p.as_array()) {
                for point in points {
                    records.push(Self::point_to_record(point)?);
                }
            }

            offset = result
                .get("next_page_offset")
                .filter(|v| !v.is_null())
                .cloned();
            if offset.is_none() {
                break;
            }
        }

        Ok(records)
    }
}
