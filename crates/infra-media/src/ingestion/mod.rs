// Source ingestion router (markdown, YouTube, web, mock)

mod markdown;
mod web;
mod youtube;

pub use markdown::ingest_markdown;
pub use web::{extract_page, PageText, WebIngestor};
pub use youtube::{is_youtube_url, vtt_to_text, YoutubeIngestor};

use async_trait::async_trait;
use contentforge_core::domain::ingestion::markdown_payload;
use contentforge_core::domain::{IngestionResult, SourceType};
use contentforge_core::error::Result;
use contentforge_core::port::Ingestor;
use std::path::Path;
use tracing::info;

const MOCK_TITLE: &str = "Mock Source";
const MOCK_TEXT: &str = "이 콘텐츠는 무인증 PoC 동작 확인을 위한 샘플 텍스트입니다. \
마케터가 URL을 입력하면 기획/콘텐츠 제작/검수를 자동 수행합니다.";

fn mock_result(source_ref: &str) -> IngestionResult {
    IngestionResult::new(SourceType::Mock, MOCK_TITLE, MOCK_TEXT).with_metadata("url", source_ref)
}

/// Routes a job's `source_ref` to the matching ingestor.
pub struct SourceIngestor {
    web: WebIngestor,
    youtube: YoutubeIngestor,
}

impl SourceIngestor {
    pub fn new(web: WebIngestor, youtube: YoutubeIngestor) -> Self {
        Self { web, youtube }
    }
}

#[async_trait]
impl Ingestor for SourceIngestor {
    async fn ingest(&self, source_ref: &str, workdir: &Path, mock: bool) -> Result<IngestionResult> {
        tokio::fs::create_dir_all(workdir).await?;

        if mock {
            return Ok(mock_result(source_ref));
        }
        if let Some(payload) = markdown_payload(source_ref) {
            info!(chars = payload.chars().count(), "Ingesting markdown source");
            return ingest_markdown(payload);
        }
        if is_youtube_url(source_ref) {
            info!(url = %source_ref, "Ingesting YouTube source");
            return self.youtube.ingest(source_ref, workdir).await;
        }
        info!(url = %source_ref, "Ingesting web source");
        self.web.ingest(source_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandRunner;
    use crate::transcription::{WhisperClient, WhisperConfig};
    use contentforge_core::domain::MARKDOWN_PREFIX;
    use std::sync::Arc;
    use std::time::Duration;

    fn ingestor() -> SourceIngestor {
        let whisper = WhisperClient::new(WhisperConfig {
            base_url: String::new(),
            model: "whisper-1".into(),
            api_key: String::new(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        SourceIngestor::new(
            WebIngestor::new(Duration::from_secs(1)).unwrap(),
            YoutubeIngestor::new(CommandRunner::new(Duration::from_secs(1)), Arc::new(whisper)),
        )
    }

    #[tokio::test]
    async fn test_mock_mode_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("job-1");
        let result = ingestor()
            .ingest("https://www.youtube.com/watch?v=x", &workdir, true)
            .await
            .unwrap();

        assert!(workdir.is_dir());
        assert_eq!(result.source_type, SourceType::Mock);
        assert_eq!(result.title, MOCK_TITLE);
        assert_eq!(result.metadata["url"], "https://www.youtube.com/watch?v=x");
    }

    #[tokio::test]
    async fn test_markdown_payload_is_routed_locally() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!("{}# 신제품\n본문", MARKDOWN_PREFIX);
        let result = ingestor().ingest(&source, dir.path(), false).await.unwrap();

        assert_eq!(result.source_type, SourceType::Markdown);
        assert_eq!(result.title, "신제품");
    }

    #[tokio::test]
    async fn test_blank_markdown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!("{}   ", MARKDOWN_PREFIX);
        assert!(ingestor().ingest(&source, dir.path(), false).await.is_err());
    }
}
