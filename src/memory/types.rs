// src/memory/types.rs

//! Core data types for the memory engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentiment label assigned to a conversation turn by the classifier.
///
/// The intensified variants exist because some classifiers emit them; the
/// alert trigger set defaults to the two negative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::VeryNegative => "very_negative",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
            SentimentLabel::VeryPositive => "very_positive",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, SentimentLabel::Negative | SentimentLabel::VeryNegative)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    /// Accepts the spellings produced by common classifiers: case-insensitive,
    /// with either spaces or underscores ("very negative", "VERY_NEGATIVE").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "very_negative" => Ok(SentimentLabel::VeryNegative),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            "positive" => Ok(SentimentLabel::Positive),
            "very_positive" => Ok(SentimentLabel::VeryPositive),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// One user message paired with the agent's reply, plus sentiment metadata.
/// Immutable once persisted; the store is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_text: String,
    pub agent_text: String,
    pub sentiment: SentimentLabel,
    pub score: f32,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Creates a turn with a fresh id and a server-assigned UTC timestamp.
    pub fn new(
        user_text: impl Into<String>,
        agent_text: impl Into<String>,
        sentiment: SentimentLabel,
        score: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_text: user_text.into(),
            agent_text: agent_text.into(),
            sentiment,
            score,
            timestamp: Utc::now(),
        }
    }

    /// The retrieval unit: user text and agent text joined by a newline.
    /// Embedding the pair (not the user utterance alone) means recall surfaces
    /// prior exchanges whose outcome is close to the new query.
    pub fn content(&self) -> String {
        format!("{}\n{}", self.user_text, self.agent_text)
    }
}

/// A persisted turn together with its embedding vector. The two are written
/// as a single row/point, so one can never exist without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub turn: ConversationTurn,
    pub embedding: Vec<f32>,
}

/// One recall hit: the stored record plus its similarity to the query vector.
/// Transient — rebuilt per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalledTurn {
    pub record: EmbeddingRecord,
    pub similarity: f32,
}

impl RecalledTurn {
    pub fn turn(&self) -> &ConversationTurn {
        &self.record.turn
    }
}
