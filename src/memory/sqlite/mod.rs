// src/memory/sqlite/mod.rs

pub mod migration;
pub mod store;

pub use store::SqliteVectorStore;
