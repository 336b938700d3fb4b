// src/llm/mod.rs

//! External model collaborators: chat generation and text embeddings.
//! Both are reached over HTTP and abstracted behind traits so the engine and
//! orchestrator never depend on a concrete provider.

pub mod client;
pub mod embedding;

pub use client::OpenAiChat;
pub use embedding::{EmbeddingProvider, OpenAiEmbeddings};

use async_trait::async_trait;

use crate::error::Result;

/// The language model boundary: prompt in, text out. Auth errors, rate
/// limits, and timeouts all surface uniformly as `ConvoError::Generation`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
