// src/memory/sqlite/migration.rs
//! Handles migrations for SQLite: ensures the conversation_turns table matches
//! the latest schema. Run this at startup to guarantee schema compatibility.

use anyhow::Result;
use sqlx::{Executor, SqlitePool};

/// Turn text and its embedding live in one row, so the pair is created
/// atomically — a turn can never be visible without its vector.
const CREATE_CONVERSATION_TURNS: &str = r#"
CREATE TABLE IF NOT EXISTS conversation_turns (
    id TEXT PRIMARY KEY NOT NULL,
    user_text TEXT NOT NULL,
    agent_text TEXT NOT NULL,
    content TEXT NOT NULL,
    sentiment TEXT NOT NULL,
    score REAL NOT NULL,
    timestamp DATETIME NOT NULL,
    embedding BLOB NOT NULL
);
"#;

const CREATE_TURN_INDICES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_conversation_turns_timestamp ON conversation_turns(timestamp);
"#;

/// Runs all required migrations for the SQLite backend.
/// Safe to call at every startup (idempotent).
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    pool.execute(CREATE_CONVERSATION_TURNS).await?;
    pool.execute(CREATE_TURN_INDICES).await?;
    Ok(())
}
