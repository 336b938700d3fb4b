// src/memory/traits.rs

//! Storage trait for vector-backed conversation memory. All persistence and
//! similarity search goes through this — no direct backend calls in the engine.
//!
//! The contract is deliberately append-only: records are immutable once
//! written and there is no update or delete.

use async_trait::async_trait;

use crate::error::Result;
use crate::memory::types::{EmbeddingRecord, RecalledTurn};

/// A durable store of (turn, vector) pairs with nearest-neighbor search.
/// Any index structure works as long as inserts are atomic per record and
/// search ordering is deterministic for identical input and store state.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist one record. Atomic: on error nothing is visible to readers.
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()>;

    /// Top-k records by similarity to `embedding`, descending, ties broken
    /// by id. An empty store yields an empty result, not an error.
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RecalledTurn>>;

    /// Every persisted record, for export/debugging. Unbounded; not on the
    /// hot path.
    async fn get_all(&self) -> Result<Vec<EmbeddingRecord>>;
}
