// Source Ingestion Port

use crate::domain::IngestionResult;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Turns a source reference into text the planner can work with.
///
/// Implementations route on the reference: `markdown://` payloads, video
/// platform URLs, then generic http(s) pages. `workdir` receives downloaded
/// media (source video, subtitles).
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn ingest(&self, source_ref: &str, workdir: &Path, mock: bool)
        -> Result<IngestionResult>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::SourceType;
    use crate::error::AppError;

    pub enum MockBehavior {
        Succeed(IngestionResult),
        Fail(String),
    }

    pub struct MockIngestor {
        behavior: MockBehavior,
    }

    impl MockIngestor {
        pub fn returning(result: IngestionResult) -> Self {
            Self {
                behavior: MockBehavior::Succeed(result),
            }
        }

        pub fn markdown(title: &str, text: &str) -> Self {
            Self::returning(IngestionResult::new(SourceType::Markdown, title, text))
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                behavior: MockBehavior::Fail(message.into()),
            }
        }
    }

    #[async_trait]
    impl Ingestor for MockIngestor {
        async fn ingest(
            &self,
            _source_ref: &str,
            _workdir: &Path,
            _mock: bool,
        ) -> Result<IngestionResult> {
            match &self.behavior {
                MockBehavior::Succeed(result) => Ok(result.clone()),
                MockBehavior::Fail(message) => Err(AppError::Execution(message.clone())),
            }
        }
    }
}
