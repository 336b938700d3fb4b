// src/memory/mod.rs

//! Retrieval-augmented conversation memory:
//! - Types: turns, embedding records, recall results
//! - Traits: the VectorStore seam
//! - Engine: remember / recall / get_all with the persistence invariants
//! - Storage: SQLite (flat scan) and Qdrant (REST) backends

pub mod engine;
pub mod qdrant;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use engine::MemoryEngine;
pub use traits::VectorStore;
pub use types::{ConversationTurn, EmbeddingRecord, RecalledTurn, SentimentLabel};
