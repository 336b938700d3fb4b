// src/orchestrator/mod.rs

//! Composes one request/response cycle: recall relevant history, generate an
//! answer, classify sentiment, persist the turn, and fire an alert when the
//! sentiment is in the trigger set. Each stage's failure surfaces as its own
//! error kind and stops the pipeline; nothing persists on the way down.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::alert::{AlertDispatcher, AlertPayload};
use crate::error::Result;
use crate::llm::ChatModel;
use crate::memory::MemoryEngine;
use crate::memory::types::RecalledTurn;
use crate::sentiment::{Sentiment, SentimentClassifier};

/// Result of `ask`: the generated answer plus the recalled turns that were
/// offered to the model as context (source attribution).
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: String,
    pub sources: Vec<RecalledTurn>,
}

/// Result of the full `respond` pipeline.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn_id: Uuid,
    pub answer: String,
    pub sentiment: Sentiment,
    pub sources: Vec<RecalledTurn>,
    pub alert_fired: bool,
}

pub struct ConversationOrchestrator {
    memory: Arc<MemoryEngine>,
    llm: Arc<dyn ChatModel>,
    classifier: Arc<dyn SentimentClassifier>,
    alerts: Arc<AlertDispatcher>,
    recall_k: usize,
}

impl ConversationOrchestrator {
    pub fn new(
        memory: Arc<MemoryEngine>,
        llm: Arc<dyn ChatModel>,
        classifier: Arc<dyn SentimentClassifier>,
        alerts: Arc<AlertDispatcher>,
        recall_k: usize,
    ) -> Self {
        Self {
            memory,
            llm,
            classifier,
            alerts,
            recall_k,
        }
    }

    /// Answers `user_text` using recalled history as context.
    ///
    /// Does not persist anything: the caller persists after sentiment has
    /// been computed, so the stored record always carries its metadata. On
    /// failure nothing is mutated; already-obtained recall results are
    /// discarded with the error.
    pub async fn ask(&self, user_text: &str) -> Result<AskOutcome> {
        let sources = self.memory.recall(user_text, self.recall_k).await?;
        debug!(hits = sources.len(), "recall complete");

        let prompt = build_prompt(&sources, user_text);
        let answer = self.llm.generate(&prompt).await?;

        Ok(AskOutcome { answer, sources })
    }

    /// The full per-request pipeline:
    /// recall → generate → classify → persist → (alert | no alert).
    ///
    /// The alert is fired without being awaited; a spawned dispatch survives
    /// even if this future is dropped afterwards. If the future is dropped
    /// before the persist step completed, no partial turn is written.
    pub async fn respond(&self, user_text: &str) -> Result<TurnOutcome> {
        let AskOutcome { answer, sources } = self.ask(user_text).await?;

        let sentiment = self.classifier.classify(user_text).await?;

        let turn_id = self
            .memory
            .remember(user_text, &answer, sentiment.label, sentiment.score)
            .await?;

        let alert_fired = self.alerts.should_dispatch(sentiment.label);
        if alert_fired {
            info!(turn_id = %turn_id, label = %sentiment.label, "sentiment alert triggered");
            self.alerts.dispatch(AlertPayload::new(
                user_text,
                &answer,
                sentiment.label,
                sentiment.score,
                chrono::Utc::now(),
            ));
        }

        Ok(TurnOutcome {
            turn_id,
            answer,
            sentiment,
            sources,
            alert_fired,
        })
    }
}

/// Stuffs the recalled turns' text above the new message. With no history the
/// prompt is just the message itself.
fn build_prompt(sources: &[RecalledTurn], user_text: &str) -> String {
    if sources.is_empty() {
        return user_text.to_string();
    }

    let mut prompt = String::from("Relevant past conversation:\n");
    for hit in sources {
        prompt.push_str(&hit.record.turn.content());
        prompt.push_str("\n---\n");
    }
    prompt.push_str("\nUser message:\n");
    prompt.push_str(user_text);
    prompt
}
