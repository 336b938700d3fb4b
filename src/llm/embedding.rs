// src/llm/embedding.rs
// Text embedding generation via an OpenAI-compatible embeddings endpoint.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ConvoError, Result};

/// Maps text to a fixed-length vector. Deterministic for identical input per
/// model version. Implementations fail with `ConvoError::Embedding`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

const MAX_BATCH_SIZE: usize = 100;

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// A client for generating text embeddings using the OpenAI API.
pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.embedding_model.clone(),
            dimensions: config.qdrant_embedding_dim,
        }
    }

    async fn request(&self, input: serde_json::Value) -> Result<EmbeddingResponse> {
        let body = json!({
            "model": self.model,
            "input": input,
            "dimensions": self.dimensions,
        });

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ConvoError::Embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(ConvoError::Embedding(format!(
                "embedding API error ({status}): {error_text}"
            )));
        }

        response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| ConvoError::Embedding(format!("malformed embedding response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Requesting embedding for {} chars with model {}",
            text.len(),
            self.model
        );

        let result = self.request(json!(text)).await?;
        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ConvoError::Embedding("no embedding data in API response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(ConvoError::Embedding(format!(
                "batch size {} exceeds maximum of {}",
                texts.len(),
                MAX_BATCH_SIZE
            )));
        }

        debug!(
            "Requesting embeddings for a batch of {} texts with model {}",
            texts.len(),
            self.model
        );

        let result = self.request(json!(texts)).await?;
        if result.data.len() != texts.len() {
            return Err(ConvoError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}
