// src/config/mod.rs
// All values come from the environment (.env supported); defaults match the
// original deployment. The config is built once in main and injected — there
// is no process-global instance.

use std::str::FromStr;

use serde::Deserialize;

use crate::memory::types::SentimentLabel;

/// Which backend serves the VectorStore trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Sqlite,
    Qdrant,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(VectorBackend::Sqlite),
            "qdrant" => Ok(VectorBackend::Qdrant),
            other => Err(format!("unknown vector backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // ── Database Configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Vector Store Configuration
    pub vector_backend: VectorBackend,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub qdrant_embedding_dim: usize,

    // ── OpenAI Configuration
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub system_prompt: String,

    // ── Sentiment Classifier
    pub sentiment_url: String,

    // ── Alert Webhook
    pub webhook_url: String,
    pub alert_trigger_sentiments: Vec<SentimentLabel>,
    pub alert_timeout_secs: u64,

    // ── Recall Configuration
    pub recall_k: usize,
    pub recall_degrade_to_empty: bool,

    // ── Timeouts (in seconds)
    pub llm_timeout_secs: u64,

    // ── Logging Configuration
    pub log_level: String,
}

/// Parse an env var, falling back to `default` when missing or malformed.
/// Values may carry trailing comments (`FOO=3 # turns`).
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

fn parse_trigger_set(raw: &str) -> Vec<SentimentLabel> {
    raw.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<SentimentLabel>().ok()
            }
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        // Load .env first if present; plain env vars still win.
        let _ = dotenvy::dotenv();

        let triggers = env_var_or(
            "CONVOFLOW_ALERT_TRIGGERS",
            "negative,very_negative".to_string(),
        );

        Self {
            database_url: env_var_or("DATABASE_URL", "sqlite:./convoflow.db".to_string()),
            sqlite_max_connections: env_var_or("CONVOFLOW_SQLITE_MAX_CONNECTIONS", 5),
            vector_backend: env_var_or("CONVOFLOW_VECTOR_BACKEND", VectorBackend::Sqlite),
            qdrant_url: env_var_or("QDRANT_URL", "http://localhost:6333".to_string()),
            qdrant_collection: env_var_or(
                "QDRANT_COLLECTION",
                "convoflow_memory".to_string(),
            ),
            qdrant_embedding_dim: env_var_or("QDRANT_EMBEDDING_DIM", 3072),
            openai_base_url: env_var_or(
                "OPENAI_BASE_URL",
                "https://api.openai.com".to_string(),
            ),
            openai_api_key: env_var_or("OPENAI_API_KEY", String::new()),
            chat_model: env_var_or("CONVOFLOW_CHAT_MODEL", "gpt-4o-mini".to_string()),
            embedding_model: env_var_or(
                "CONVOFLOW_EMBEDDING_MODEL",
                "text-embedding-3-large".to_string(),
            ),
            system_prompt: env_var_or(
                "CONVOFLOW_SYSTEM_PROMPT",
                "You are a helpful assistant. Use the provided past conversation \
                 excerpts when they are relevant to the user's message."
                    .to_string(),
            ),
            sentiment_url: env_var_or(
                "CONVOFLOW_SENTIMENT_URL",
                "http://localhost:8085/classify".to_string(),
            ),
            webhook_url: env_var_or(
                "CONVOFLOW_WEBHOOK_URL",
                "http://localhost:5678/webhook/convoflow-alerts".to_string(),
            ),
            alert_trigger_sentiments: parse_trigger_set(&triggers),
            alert_timeout_secs: env_var_or("CONVOFLOW_ALERT_TIMEOUT", 10),
            recall_k: env_var_or("CONVOFLOW_RECALL_K", 3),
            recall_degrade_to_empty: env_var_or("CONVOFLOW_RECALL_DEGRADE", false),
            llm_timeout_secs: env_var_or("CONVOFLOW_LLM_TIMEOUT", 60),
            log_level: env_var_or("CONVOFLOW_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Full OpenAI API URL for a given endpoint.
    pub fn openai_api_url(&self, endpoint: &str) -> String {
        format!("{}/v1/{}", self.openai_base_url, endpoint)
    }
}
