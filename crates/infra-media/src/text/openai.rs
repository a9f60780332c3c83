// OpenAI chat completions provider

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

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
    backoff: BackoffPolicy,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
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

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

/// `choices[0].message.content`, either a string or a list of text parts.
fn extract_content(data: &Value) -> std::result::Result<String, ProviderError> {
    let content = data
        .pointer("/choices/0/message/content")
        .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0].message.content".into()))?;
    match content {
        Value::String(text) => Ok(text.clone()),
        Value::Array(parts) => Ok(parts
            .iter()
            .map(|part| part.get("text").and_then(Value::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
            return Err(ProviderError::Unavailable("OPENAI_API_KEY is missing".into()));
        }

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": max_tokens,
        });
        let url = self.endpoint();
        debug!(provider = "openai", model = %self.config.model, max_tokens, "Requesting completion");

        let data = self
            .backoff
            .run("openai", || {
                send_json(
                    self.client
                        .post(&url)
                        .bearer_auth(&self.config.api_key)
                        .json(&payload),
                )
            })
            .await?;
        extract_content(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str, api_key: &str) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: api_key.to_string(),
            model: "gpt-4.1-mini".to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
        .with_backoff(BackoffPolicy {
            max_attempts: 3,
            unit: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_jitter: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn test_generate_sends_chat_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "안녕하세요"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server.uri(), "sk-test")
            .generate("system", "user", 900)
            .await
            .unwrap();
        assert_eq!(text, "안녕하세요");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["max_tokens"], 900);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}}]
            })))
            .mount(&server)
            .await;

        let text = provider(&server.uri(), "sk-test")
            .generate("s", "u", 10)
            .await
            .unwrap();
        assert_eq!(text, "a\nb");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let err = provider(&server.uri(), "sk-test")
            .generate("s", "u", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 400, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let p = provider("http://127.0.0.1:9", "");
        assert!(!p.is_available());
        let err = p.generate("s", "u", 10).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
