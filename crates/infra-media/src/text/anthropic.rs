// Anthropic messages provider

use super::TEMPERATURE;
use crate::http::{build_client, send_json};
use async_trait::async_trait;
use contentforge_core::application::BackoffPolicy;
use contentforge_core::error::Result;
use contentforge_core::port::{ProviderError, TextProvider};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
    backoff: BackoffPolicy,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            backoff: BackoffPolicy::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Concatenate the `text` blocks of a messages response.
fn extract_text(data: &Value) -> std::result::Result<String, ProviderError> {
    let blocks = data
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing content blocks".into()))?;
    Ok(blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable("ANTHROPIC_API_KEY is missing".into()));
        }

        let payload = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "temperature": TEMPERATURE,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_prompt}],
        });
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        debug!(provider = "anthropic", model = %self.config.model, max_tokens, "Requesting completion");

        let data = self
            .backoff
            .run("anthropic", || {
                send_json(
                    self.client
                        .post(&url)
                        .header("x-api-key", &self.config.api_key)
                        .header("anthropic-version", API_VERSION)
                        .json(&payload),
                )
            })
            .await?;
        extract_text(&data)
    }
}
