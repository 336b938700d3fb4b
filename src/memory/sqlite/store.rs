// src/memory/sqlite/store.rs

//! Implements VectorStore for SQLite. Search is a flat scan: every stored
//! embedding is loaded and cosine-ranked in process. Fine for conversation
//! memory sizes; swap in an indexed backend behind the same trait if it isn't.

use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{ConvoError, Result};
use crate::memory::traits::VectorStore;
use crate::memory::types::{ConversationTurn, EmbeddingRecord, RecalledTurn, SentimentLabel};

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Helper to convert Vec<f32> to Vec<u8> for BLOB storage
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    // Helper to convert BLOB (Vec<u8>) to Vec<f32>
    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunks_exact(4)")))
            .collect()
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<EmbeddingRecord> {
        let id: String = row.get("id");
        let id = Uuid::parse_str(&id)
            .map_err(|e| ConvoError::StoreUnavailable(format!("corrupt turn id: {e}")))?;

        let sentiment: String = row.get("sentiment");
        let sentiment = SentimentLabel::from_str(&sentiment)
            .map_err(|e| ConvoError::StoreUnavailable(format!("corrupt sentiment: {e}")))?;

        let timestamp: NaiveDateTime = row.get("timestamp");
        let embedding: Vec<u8> = row.get("embedding");

        Ok(EmbeddingRecord {
            turn: ConversationTurn {
                id,
                user_text: row.get("user_text"),
                agent_text: row.get("agent_text"),
                sentiment,
                score: row.get("score"),
                timestamp: Utc.from_utc_datetime(&timestamp),
            },
            embedding: Self::blob_to_embedding(&embedding),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()> {
        let turn = &record.turn;

        sqlx::query(
            r#"
            INSERT INTO conversation_turns (
                id, user_text, agent_text, content,
                sentiment, score, timestamp, embedding
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(turn.id.to_string())
        .bind(&turn.user_text)
        .bind(&turn.agent_text)
        .bind(turn.content())
        .bind(turn.sentiment.as_str())
        .bind(turn.score)
        .bind(turn.timestamp.naive_utc())
        .bind(Self::embedding_to_blob(&record.embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| ConvoError::StoreUnavailable(format!("sqlite insert failed: {e}")))?;

        Ok(())
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RecalledTurn>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let records = self.get_all().await?;

        let mut hits: Vec<RecalledTurn> = records
            .into_iter()
            .map(|record| {
                let similarity = cosine_similarity(embedding, &record.embedding);
                RecalledTurn { record, similarity }
            })
            .collect();

        // Descending similarity; ties broken by id so repeated queries against
        // an unchanged store return the same ordering.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.turn().id.cmp(&b.turn().id))
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn get_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_text, agent_text, sentiment, score, timestamp, embedding
            FROM conversation_turns
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConvoError::StoreUnavailable(format!("sqlite read failed: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

/// Cosine similarity over f64 accumulators. Mismatched lengths or zero-norm
/// vectors rank last rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
