// src/alert/mod.rs

//! Fire-and-forget alert dispatch. When a turn's sentiment lands in the
//! trigger set, a webhook is notified on a spawned task; the conversation
//! path never waits on delivery and never sees its outcome. No retries —
//! at most one dispatch per turn.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ConvoError, Result};
use crate::memory::types::SentimentLabel;

/// Webhook wire shape: `{"user_text", "ai_text", "metadata": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub user_text: String,
    #[serde(rename = "ai_text")]
    pub agent_text: String,
    pub metadata: AlertMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertMetadata {
    pub sentiment: SentimentLabel,
    pub score: f32,
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    pub fn new(
        user_text: impl Into<String>,
        agent_text: impl Into<String>,
        sentiment: SentimentLabel,
        score: f32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_text: user_text.into(),
            agent_text: agent_text.into(),
            metadata: AlertMetadata {
                sentiment,
                score,
                timestamp,
            },
        }
    }
}

pub struct AlertDispatcher {
    client: Client,
    webhook_url: String,
    triggers: HashSet<SentimentLabel>,
}

impl AlertDispatcher {
    pub fn new(
        webhook_url: impl Into<String>,
        triggers: impl IntoIterator<Item = SentimentLabel>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConvoError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            triggers: triggers.into_iter().collect(),
        })
    }

    /// Whether `label` is in the configured trigger set.
    pub fn should_dispatch(&self, label: SentimentLabel) -> bool {
        self.triggers.contains(&label)
    }

    /// Enqueues delivery and returns immediately. A failed or timed-out
    /// delivery is logged and dropped; it is never surfaced to the caller and
    /// is not cancelled if the originating request aborts.
    pub fn dispatch(&self, payload: AlertPayload) {
        let client = self.client.clone();
        let url = self.webhook_url.clone();

        tokio::spawn(async move {
            match send_webhook(&client, &url, &payload).await {
                Ok(status) => info!("alert webhook delivered ({status})"),
                Err(e) => warn!("alert webhook delivery failed: {e}"),
            }
        });
    }
}

async fn send_webhook(client: &Client, url: &str, payload: &AlertPayload) -> Result<u16> {
    let resp = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| ConvoError::AlertDelivery(format!("webhook unreachable: {e}")))?;

    let status = resp.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(ConvoError::AlertDelivery(format!(
            "webhook returned {status}: {body}"
        )))
    }
}
