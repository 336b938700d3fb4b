// tests/common/mod.rs
//! Shared stubs and fixtures for integration tests: deterministic in-process
//! collaborators plus a tiny axum webhook endpoint.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Json, Router, http::StatusCode, routing::post};
use sqlx::sqlite::SqlitePoolOptions;

use convoflow::error::{ConvoError, Result};
use convoflow::llm::{ChatModel, EmbeddingProvider};
use convoflow::memory::sqlite::{SqliteVectorStore, migration};
use convoflow::memory::traits::VectorStore;
use convoflow::memory::types::{EmbeddingRecord, RecalledTurn};
use convoflow::sentiment::{Sentiment, SentimentClassifier};

pub const DIM: usize = 8;

/// Deterministic embedder: pinned texts map to fixed vectors, everything else
/// to a bag-of-bytes vector, so identical text always embeds identically.
pub struct StubEmbedder {
    pinned: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            pinned: HashMap::new(),
        }
    }

    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.pinned.get(text) {
            return v.clone();
        }
        let mut v = vec![0.0f32; DIM];
        for (i, b) in text.bytes().enumerate() {
            v[(b as usize + i) % DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(ConvoError::Embedding("stub embedder offline".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(ConvoError::Embedding("stub embedder offline".to_string()))
    }
}

/// Chat model returning a canned answer; records every prompt it was given.
pub struct StubChat {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl StubChat {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for StubChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

pub struct FailingChat;

#[async_trait]
impl ChatModel for FailingChat {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(ConvoError::Generation("stub model unreachable".to_string()))
    }
}

pub struct StubClassifier {
    pub sentiment: Sentiment,
}

impl StubClassifier {
    pub fn new(sentiment: Sentiment) -> Self {
        Self { sentiment }
    }
}

#[async_trait]
impl SentimentClassifier for StubClassifier {
    async fn classify(&self, _text: &str) -> Result<Sentiment> {
        Ok(self.sentiment)
    }
}

pub struct FailingClassifier;

#[async_trait]
impl SentimentClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<Sentiment> {
        Err(ConvoError::Classification(
            "stub classifier offline".to_string(),
        ))
    }
}

/// Store whose write path is down.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn insert(&self, _record: &EmbeddingRecord) -> Result<()> {
        Err(ConvoError::StoreUnavailable("stub store down".to_string()))
    }

    async fn search(&self, _embedding: &[f32], _k: usize) -> Result<Vec<RecalledTurn>> {
        Err(ConvoError::StoreUnavailable("stub store down".to_string()))
    }

    async fn get_all(&self) -> Result<Vec<EmbeddingRecord>> {
        Err(ConvoError::StoreUnavailable("stub store down".to_string()))
    }
}

/// In-memory SQLite store with migrations applied.
pub async fn sqlite_store() -> SqliteVectorStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    migration::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    SqliteVectorStore::new(pool)
}

/// Spawns a webhook endpoint that counts hits, optionally delays, answers
/// with `status`, and captures the last received body. Returns its URL.
pub async fn spawn_webhook(
    counter: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<serde_json::Value>>>,
    status: StatusCode,
    delay: Duration,
) -> String {
    let app = Router::new().route(
        "/webhook",
        post(move |Json(body): Json<serde_json::Value>| {
            let counter = counter.clone();
            let last_body = last_body.clone();
            async move {
                tokio::time::sleep(delay).await;
                counter.fetch_add(1, Ordering::SeqCst);
                *last_body.lock().unwrap() = Some(body);
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind webhook listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/webhook")
}

/// Polls `counter` until it reaches `expected` or the deadline passes.
pub async fn wait_for_count(counter: &AtomicUsize, expected: usize, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if counter.load(Ordering::SeqCst) >= expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
