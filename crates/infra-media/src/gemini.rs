// Image generation API client (Gemini "Nanobanana" and generic endpoints)

use crate::http::{build_client, is_image_response, send};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use contentforge_core::application::BackoffPolicy;
use contentforge_core::error::Result;
use contentforge_core::port::ProviderError;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const GEMINI_HOST: &str = "generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

static MODEL_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/models/[^/:]+:generateContent").expect("valid model segment regex")
});

#[derive(Debug, Clone)]
pub struct ImageApiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Raw image bytes returned by the API, before any resizing
pub struct ImageApiClient {
    config: ImageApiConfig,
    client: Client,
    backoff: BackoffPolicy,
}

impl ImageApiClient {
    pub fn new(config: ImageApiConfig) -> Result<Self> {
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

    pub fn is_configured(&self) -> bool {
        !self.config.api_url.trim().is_empty() && !self.config.api_key.trim().is_empty()
    }

    /// Model name without a `models/` prefix, defaulting when blank.
    pub fn model(&self) -> &str {
        let model = self.config.model.trim();
        if model.is_empty() {
            return DEFAULT_IMAGE_MODEL;
        }
        model.strip_prefix("models/").unwrap_or(model)
    }

    fn is_gemini(url: &str) -> bool {
        url.contains(GEMINI_HOST)
    }

    /// Card-news and thumbnail request: configured URL as-is.
    pub async fn generate_visual(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        self.ensure_configured()?;
        let url = self.config.api_url.trim().to_string();
        if Self::is_gemini(&url) {
            let payload = gemini_payload(prompt);
            return self.request_gemini(&url, &payload).await;
        }
        self.request_generic(&url, prompt, width, height).await
    }

    /// Chart request: Gemini URLs are pointed at the configured model,
    /// other URLs get a Gemini-shaped payload with bearer auth.
    pub async fn generate_chart(&self, prompt: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        self.ensure_configured()?;
        let url = chart_api_url(self.config.api_url.trim(), self.model());
        if Self::is_gemini(&url) {
            return self.request_gemini(&url, &gemini_payload(prompt)).await;
        }

        let payload = json!({
            "model": format!("models/{}", self.model()),
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseMimeType": "",
                "responseModalities": ["IMAGE"],
            },
        });
        self.backoff
            .run("image-api", || {
                let request = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&payload);
                async move { read_image_or_inline(request).await }
            })
            .await
    }

    fn ensure_configured(&self) -> std::result::Result<(), ProviderError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ProviderError::Unavailable(
                "NANOBANANA_API_URL / NANOBANANA_API_KEY is required".into(),
            ))
        }
    }

    async fn request_gemini(
        &self,
        url: &str,
        payload: &Value,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        debug!(provider = "gemini", model = self.model(), "Requesting image");
        self.backoff
            .run("gemini", || {
                let request = self
                    .client
                    .post(url)
                    .header("x-goog-api-key", &self.config.api_key)
                    .json(payload);
                async move { read_image_or_inline(request).await }
            })
            .await
    }

    async fn request_generic(
        &self,
        url: &str,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "width": width,
            "height": height,
            "format": "png",
        });
        let response = send(
            self.client
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&payload),
        )
        .await?;
        if is_image_response(&response) {
            return read_bytes(response).await;
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        match extract_generic_image(&data)? {
            GenericImage::Bytes(bytes) => Ok(bytes),
            GenericImage::Url(image_url) => {
                read_bytes(send(self.client.get(&image_url)).await?).await
            }
        }
    }
}

fn gemini_payload(prompt: &str) -> Value {
    json!({
        "contents": [{"parts": [{"text": prompt}]}],
        "generationConfig": {"responseModalities": ["IMAGE"]},
    })
}

async fn read_bytes(response: reqwest::Response) -> std::result::Result<Vec<u8>, ProviderError> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ProviderError::Transport(e.to_string()))
}

async fn read_image_or_inline(
    request: reqwest::RequestBuilder,
) -> std::result::Result<Vec<u8>, ProviderError> {
    let response = send(request).await?;
    if is_image_response(&response) {
        return read_bytes(response).await;
    }
    let data: Value = response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    extract_inline_image(&data)
        .ok_or_else(|| ProviderError::InvalidResponse("image response did not include inlineData".into()))
}

fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    STANDARD.decode(encoded.trim()).ok()
}

/// First base64 image found in `candidates[].content.parts[]`.
pub fn extract_inline_image(data: &Value) -> Option<Vec<u8>> {
    let candidates = data.get("candidates")?.as_array()?;
    for candidate in candidates {
        let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) else {
            continue;
        };
        for part in parts {
            for key in ["inlineData", "inline_data", "fileData", "file_data"] {
                let encoded = part.get(key).and_then(|blob| {
                    blob.get("data")
                        .or_else(|| blob.get("bytesBase64Encoded"))
                        .and_then(Value::as_str)
                });
                if let Some(bytes) = encoded.and_then(decode_base64) {
                    return Some(bytes);
                }
            }
            if let Some(bytes) = part
                .get("data")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .and_then(decode_base64)
            {
                return Some(bytes);
            }
        }
    }
    None
}

#[derive(Debug, PartialEq)]
enum GenericImage {
    Bytes(Vec<u8>),
    Url(String),
}

fn extract_generic_image(data: &Value) -> std::result::Result<GenericImage, ProviderError> {
    let unsupported =
        || ProviderError::InvalidResponse("image API did not return a supported payload".into());

    for key in ["image_base64", "b64_json"] {
        if let Some(bytes) = data.get(key).and_then(Value::as_str).and_then(decode_base64) {
            return Ok(GenericImage::Bytes(bytes));
        }
    }
    let first = data
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .ok_or_else(unsupported)?;
    if let Some(bytes) = first.as_str().and_then(decode_base64) {
        return Ok(GenericImage::Bytes(bytes));
    }
    if let Some(bytes) = first.get("b64_json").and_then(Value::as_str).and_then(decode_base64) {
        return Ok(GenericImage::Bytes(bytes));
    }
    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Ok(GenericImage::Url(url.to_string()));
    }
    Err(unsupported())
}

/// Rewrite a Gemini URL to target `model`; other URLs pass through.
pub fn chart_api_url(raw: &str, model: &str) -> String {
    if !raw.contains(GEMINI_HOST) {
        return raw.to_string();
    }
    let replacement = format!("/models/{}:generateContent", model);
    if MODEL_SEGMENT.is_match(raw) {
        return MODEL_SEGMENT
            .replace(raw, regex::NoExpand(&replacement))
            .into_owned();
    }
    let scheme_end = raw.find("://").map(|i| i + 3).unwrap_or(0);
    let host_end = raw[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(raw.len());
    format!("{}/v1beta{}", &raw[..host_end], replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(url: &str) -> ImageApiClient {
        ImageApiClient::new(ImageApiConfig {
            api_url: url.to_string(),
            api_key: "img-key".to_string(),
            model: "models/custom-image".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
        .with_backoff(BackoffPolicy {
            max_attempts: 2,
            unit: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        })
    }

    #[test]
    fn test_extract_inline_image_variants() {
        let encoded = STANDARD.encode(b"png-bytes");
        let camel = json!({"candidates": [{"content": {"parts": [
            {"text": "caption"},
            {"inlineData": {"mimeType": "image/png", "data": encoded}}
        ]}}]});
        assert_eq!(extract_inline_image(&camel).unwrap(), b"png-bytes");

        let snake = json!({"candidates": [{"content": {"parts": [
            {"inline_data": {"bytesBase64Encoded": encoded}}
        ]}}]});
        assert_eq!(extract_inline_image(&snake).unwrap(), b"png-bytes");

        let text_only = json!({"candidates": [{"content": {"parts": [{"text": "no"}]}}]});
        assert!(extract_inline_image(&text_only).is_none());
    }

    #[test]
    fn test_extract_generic_payloads() {
        let encoded = STANDARD.encode(b"img");
        assert_eq!(
            extract_generic_image(&json!({"b64_json": encoded})).unwrap(),
            GenericImage::Bytes(b"img".to_vec())
        );
        assert_eq!(
            extract_generic_image(&json!({"images": [encoded]})).unwrap(),
            GenericImage::Bytes(b"img".to_vec())
        );
        assert_eq!(
            extract_generic_image(&json!({"images": [{"url": "https://cdn/x.png"}]})).unwrap(),
            GenericImage::Url("https://cdn/x.png".into())
        );
        assert!(extract_generic_image(&json!({"status": "ok"})).is_err());
    }

    #[test]
    fn test_chart_api_url_rewrites_gemini_model() {
        assert_eq!(
            chart_api_url(
                "https://generativelanguage.googleapis.com/v1beta/models/old:generateContent",
                "new-model"
            ),
            "https://generativelanguage.googleapis.com/v1beta/models/new-model:generateContent"
        );
        assert_eq!(
            chart_api_url("https://generativelanguage.googleapis.com/anything", "m"),
            "https://generativelanguage.googleapis.com/v1beta/models/m:generateContent"
        );
        assert_eq!(chart_api_url("https://img.example/api", "m"), "https://img.example/api");
    }

    #[test]
    fn test_model_strips_prefix() {
        assert_eq!(client("https://x").model(), "custom-image");
    }

    #[tokio::test]
    async fn test_generic_endpoint_returns_raw_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("Authorization", "Bearer img-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"raw".to_vec()),
            )
            .mount(&server)
            .await;

        let bytes = client(&format!("{}/generate", server.uri()))
            .generate_visual("prompt", 1280, 720)
            .await
            .unwrap();
        assert_eq!(bytes, b"raw");
    }

    #[tokio::test]
    async fn test_generic_endpoint_follows_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{"url": format!("{}/files/1.png", server.uri())}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fetched".to_vec()))
            .mount(&server)
            .await;

        let bytes = client(&format!("{}/generate", server.uri()))
            .generate_visual("prompt", 1080, 1080)
            .await
            .unwrap();
        assert_eq!(bytes, b"fetched");
    }

    #[tokio::test]
    async fn test_chart_request_uses_gemini_shaped_payload() {
        let server = MockServer::start().await;
        let encoded = STANDARD.encode(b"chart");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"inlineData": {"data": encoded}}]}}]
            })))
            .mount(&server)
            .await;

        let bytes = client(&server.uri()).generate_chart("bars").await.unwrap();
        assert_eq!(bytes, b"chart");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "models/custom-image");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_unavailable() {
        let c = client("");
        let err = c.generate_visual("p", 1, 1).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
