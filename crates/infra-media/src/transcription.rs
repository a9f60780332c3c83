// Whisper-compatible speech-to-text client

use crate::http::{build_client, send};
use contentforge_core::application::BackoffPolicy;
use contentforge_core::error::{AppError, Result};
use contentforge_core::port::ProviderError;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// A timed slice of a transcript, in seconds from the media start.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// OpenAI-compatible base URL (e.g. `https://api.openai.com/v1`)
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when non-empty
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

pub struct WhisperClient {
    config: WhisperConfig,
    client: Client,
    backoff: BackoffPolicy,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> Result<Self> {
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

    pub fn is_available(&self) -> bool {
        !self.config.base_url.trim().is_empty()
    }

    /// Transcribe a media file with segment timestamps.
    pub async fn transcribe(&self, media: &Path) -> Result<Transcript> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable("WHISPER_BASE_URL is not configured".into()).into());
        }

        let bytes = tokio::fs::read(media).await?;
        let file_name = media
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media.mp4")
            .to_string();
        let url = format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .backoff
            .run("whisper", || {
                let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = Form::new()
                    .part("file", part)
                    .text("model", self.config.model.clone())
                    .text("response_format", "verbose_json");
                let mut request = self.client.post(&url).multipart(form);
                if !self.config.api_key.trim().is_empty() {
                    request = request.bearer_auth(&self.config.api_key);
                }
                async move {
                    send(request)
                        .await?
                        .json::<WhisperResponse>()
                        .await
                        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
                }
            })
            .await
            .map_err(AppError::from)?;

        let segments: Vec<TranscriptSegment> = response
            .segments
            .into_iter()
            .filter_map(|s| {
                let text = s.text.trim().to_string();
                (!text.is_empty()).then_some(TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text,
                })
            })
            .collect();

        info!(
            file = %file_name,
            segments = segments.len(),
            "Transcription finished"
        );
        Ok(Transcript {
            text: response.text.trim().to_string(),
            segments,
        })
    }

    /// Plain transcript text, one segment per line.
    pub async fn transcribe_text(&self, media: &Path) -> Result<String> {
        let transcript = self.transcribe(media).await?;
        let text = if transcript.segments.is_empty() {
            transcript.text
        } else {
            transcript
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        if text.trim().is_empty() {
            return Err(AppError::Execution("Whisper 전사 결과가 비어 있습니다.".into()));
        }
        Ok(text)
    }
}
