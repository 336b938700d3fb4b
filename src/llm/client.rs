// src/llm/client.rs
// Chat completion client for an OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ConvoError, Result};
use crate::llm::ChatModel;

pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl OpenAiChat {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| ConvoError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": prompt},
            ],
        });

        debug!("Requesting chat completion ({} prompt chars)", prompt.len());

        let resp = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConvoError::Generation("chat completion timed out".to_string())
                } else {
                    ConvoError::Generation(format!("chat completion request failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let detail = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "auth rejected",
                StatusCode::TOO_MANY_REQUESTS => "rate limited",
                _ => "request rejected",
            };
            return Err(ConvoError::Generation(format!(
                "chat completion {detail} ({status}): {text}"
            )));
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ConvoError::Generation(format!("malformed chat response: {e}")))?;

        resp_json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ConvoError::Generation("no content in chat response".to_string()))
    }
}
