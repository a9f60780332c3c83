// Shared HTTP plumbing for provider clients

use contentforge_core::error::{AppError, Result};
use contentforge_core::port::ProviderError;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Upper bound on error bodies carried into messages
const ERROR_BODY_LIMIT: usize = 500;

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Send a request and turn non-2xx statuses into `ProviderError::Http`.
pub async fn send(request: RequestBuilder) -> std::result::Result<Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}

pub async fn send_json(request: RequestBuilder) -> std::result::Result<Value, ProviderError> {
    send(request)
        .await?
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// True when the response declares an image body.
pub fn is_image_response(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("image/"))
        .unwrap_or(false)
}
