// src/error.rs
// Standardized error types for ConvoFlow

use thiserror::Error;

/// Main error type for the ConvoFlow library.
///
/// Hot-path failures (retrieval, generation, persistence) carry their own
/// variant so callers can tell the stages apart. Alert delivery errors never
/// leave the dispatcher; they exist here only so the delivery code can use `?`.
#[derive(Error, Debug)]
pub enum ConvoError {
    #[error("embedding failure: {0}")]
    Embedding(String),

    #[error("generation failure: {0}")]
    Generation(String),

    #[error("classification failure: {0}")]
    Classification(String),

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("retrieval failure: {0}")]
    Retrieval(String),

    #[error("alert delivery failure: {0}")]
    AlertDelivery(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using ConvoError
pub type Result<T> = std::result::Result<T, ConvoError>;

impl ConvoError {
    /// True for failures that occurred while serving a recall query.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, ConvoError::Retrieval(_))
    }
}

impl From<String> for ConvoError {
    fn from(s: String) -> Self {
        ConvoError::Config(s)
    }
}
