// Content Generator Ports (visual, chart, shorts)
// Each generator owns one soft-failable pipeline stage.

use crate::domain::PromptMap;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Files produced by a stage plus its non-fatal warnings
#[derive(Debug, Clone, Default)]
pub struct GeneratedAssets {
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Result of probing a rendered clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Input of the shorts stage
#[derive(Debug, Clone)]
pub struct ShortsRequest {
    pub source_ref: String,
    pub video_path: Option<PathBuf>,
    /// Directory holding `shorts-NN.md` scripts (first line is the opening caption)
    pub scripts_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mock: bool,
    pub clip_count: usize,
}

/// Card-news slides and the thumbnail.
///
/// Implementations fall back to a locally rendered image on any per-image
/// failure and report it as a warning instead of an error.
#[async_trait]
pub trait VisualGenerator: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn generate_assets(
        &self,
        brief: &str,
        output_dir: &Path,
        prompts: &PromptMap,
        mock: bool,
        want_card_news: bool,
        want_thumbnail: bool,
    ) -> Result<GeneratedAssets>;
}

/// Overview and trend charts. Always produces exactly two images.
#[async_trait]
pub trait ChartGenerator: Send + Sync {
    async fn generate_assets(
        &self,
        brief: &str,
        output_dir: &Path,
        prompts: &PromptMap,
        mock: bool,
    ) -> Result<GeneratedAssets>;
}

/// Vertical clips cut from the source video
#[async_trait]
pub trait ShortsGenerator: Send + Sync {
    async fn generate_assets(&self, request: &ShortsRequest) -> Result<GeneratedAssets>;

    /// Width, height and duration of a clip, or None if probing is unavailable.
    async fn probe(&self, video_path: &Path) -> Option<VideoProbe>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::layout;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn touch(path: PathBuf) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, b"stub").await?;
        Ok(path)
    }

    /// Writes placeholder files at the real layout paths
    pub struct StubVisualGenerator {
        pub slide_count: usize,
        pub fail_with: Option<String>,
        calls: AtomicUsize,
    }

    impl StubVisualGenerator {
        pub fn new(slide_count: usize) -> Self {
            Self {
                slide_count,
                fail_with: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                slide_count: 0,
                fail_with: Some(message.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisualGenerator for StubVisualGenerator {
        async fn generate_assets(
            &self,
            _brief: &str,
            output_dir: &Path,
            _prompts: &PromptMap,
            _mock: bool,
            want_card_news: bool,
            want_thumbnail: bool,
        ) -> Result<GeneratedAssets> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.fail_with {
                return Err(AppError::Execution(message.clone()));
            }
            let mut assets = GeneratedAssets::default();
            if want_card_news {
                for index in 1..=self.slide_count {
                    assets
                        .artifacts
                        .push(touch(output_dir.join(layout::card_slide(index))).await?);
                }
            }
            if want_thumbnail {
                assets
                    .artifacts
                    .push(touch(output_dir.join(layout::THUMBNAIL)).await?);
            }
            Ok(assets)
        }
    }

    /// Writes both chart placeholders
    #[derive(Default)]
    pub struct StubChartGenerator {
        calls: AtomicUsize,
    }

    impl StubChartGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChartGenerator for StubChartGenerator {
        async fn generate_assets(
            &self,
            _brief: &str,
            output_dir: &Path,
            _prompts: &PromptMap,
            _mock: bool,
        ) -> Result<GeneratedAssets> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut assets = GeneratedAssets::default();
            for rel in [layout::CHART_OVERVIEW, layout::CHART_TREND] {
                assets.artifacts.push(touch(output_dir.join(rel)).await?);
            }
            Ok(assets)
        }
    }

    /// Writes clip placeholders and answers probes with a fixed result
    pub struct StubShortsGenerator {
        pub probe_result: Option<VideoProbe>,
        calls: AtomicUsize,
    }

    impl StubShortsGenerator {
        pub fn new(probe_result: Option<VideoProbe>) -> Self {
            Self {
                probe_result,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShortsGenerator for StubShortsGenerator {
        async fn generate_assets(&self, request: &ShortsRequest) -> Result<GeneratedAssets> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut assets = GeneratedAssets::default();
            for index in 1..=request.clip_count {
                let name = format!("shorts-{:02}.mp4", index);
                assets
                    .artifacts
                    .push(touch(request.output_dir.join(name)).await?);
            }
            Ok(assets)
        }

        async fn probe(&self, _video_path: &Path) -> Option<VideoProbe> {
            self.probe_result
        }
    }
}
