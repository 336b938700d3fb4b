// src/sentiment/mod.rs

//! Sentiment classification boundary. The classifier is an external
//! collaborator: text in, (label, score) out.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ConvoError, Result};
use crate::memory::types::SentimentLabel;

/// Classifier output: a label plus a confidence score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f32,
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment>;
}

#[derive(Debug, Deserialize)]
struct Candidate {
    label: String,
    score: f32,
}

/// Classifies text via an HTTP inference endpoint that accepts
/// `{"inputs": "..."}` and answers with scored label candidates
/// (`[[{"label", "score"}, ...]]` or the flattened single-input form).
pub struct HttpSentimentClassifier {
    client: Client,
    url: String,
}

impl HttpSentimentClassifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Raw model labels from the twitter-roberta family come through as
    /// LABEL_0/1/2; friendlier endpoints emit the names directly.
    fn map_label(raw: &str) -> Result<SentimentLabel> {
        match raw {
            "LABEL_0" => Ok(SentimentLabel::Negative),
            "LABEL_1" => Ok(SentimentLabel::Neutral),
            "LABEL_2" => Ok(SentimentLabel::Positive),
            other => other
                .parse::<SentimentLabel>()
                .map_err(ConvoError::Classification),
        }
    }
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| ConvoError::Classification(format!("classifier unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ConvoError::Classification(format!(
                "classifier error ({status}): {body}"
            )));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ConvoError::Classification(format!("malformed response: {e}")))?;

        // Batched responses nest one candidate list per input.
        let candidates: Vec<Candidate> = match &value {
            serde_json::Value::Array(outer) if outer.first().is_some_and(|v| v.is_array()) => {
                serde_json::from_value(outer[0].clone())?
            }
            _ => serde_json::from_value(value)?,
        };

        let best = candidates
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| {
                ConvoError::Classification("classifier returned no candidates".to_string())
            })?;

        let label = Self::map_label(&best.label)?;
        debug!(label = %label, score = best.score, "classified sentiment");

        Ok(Sentiment {
            label,
            score: best.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_model_labels() {
        assert_eq!(
            HttpSentimentClassifier::map_label("LABEL_0").unwrap(),
            SentimentLabel::Negative
        );
        assert_eq!(
            HttpSentimentClassifier::map_label("LABEL_1").unwrap(),
            SentimentLabel::Neutral
        );
        assert_eq!(
            HttpSentimentClassifier::map_label("LABEL_2").unwrap(),
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_map_named_labels() {
        assert_eq!(
            HttpSentimentClassifier::map_label("negative").unwrap(),
            SentimentLabel::Negative
        );
        assert_eq!(
            HttpSentimentClassifier::map_label("very negative").unwrap(),
            SentimentLabel::VeryNegative
        );
        assert!(HttpSentimentClassifier::map_label("LABEL_9").is_err());
    }
}
