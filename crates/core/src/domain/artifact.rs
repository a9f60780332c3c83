// Artifact Domain Model
// Artifacts are derived from the job directory, never stored as rows.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions that may be downloaded through the API.
pub const DOWNLOADABLE_EXTENSIONS: [&str; 6] = ["md", "png", "jpg", "jpeg", "mp4", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Markdown,
    Image,
    Video,
    File,
}

impl ArtifactKind {
    /// Infer the kind from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "md" => ArtifactKind::Markdown,
            "png" | "jpg" | "jpeg" => ArtifactKind::Image,
            "mp4" => ArtifactKind::Video,
            _ => ArtifactKind::File,
        }
    }
}

/// A produced file, relative to the job directory (always `/`-separated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub size: u64,
}

/// Relative paths of the job output tree.
///
/// The reviewer and the API both depend on these names.
pub mod layout {
    use std::path::{Path, PathBuf};

    /// Scratch space for ingestion downloads inside a job directory
    pub const WORK_DIR: &str = "_tmp";
    pub const BRIEF: &str = "brief.md";
    pub const REVIEW_REPORT: &str = "review-report.md";
    pub const NEWSLETTER: &str = "newsletter.md";
    pub const BLOG: &str = "blog.md";
    pub const LINKEDIN: &str = "linkedin.md";
    pub const YOUTUBE_SCRIPT: &str = "youtube-script.md";
    pub const THREADS_DIR: &str = "threads";
    pub const SHORTS_SCRIPTS_DIR: &str = "shorts-scripts";
    pub const VISUALS_DIR: &str = "visuals";
    pub const THUMBNAIL: &str = "visuals/thumbnail.png";
    pub const CARD_NEWS_DIR: &str = "visuals/card-news";
    pub const CHARTS_DIR: &str = "charts";
    pub const CHART_OVERVIEW: &str = "charts/overview.png";
    pub const CHART_TREND: &str = "charts/trend.png";
    pub const SHORTS_VIDEOS_DIR: &str = "shorts-videos";

    pub const THREAD_COUNT: usize = 10;
    pub const SHORTS_COUNT: usize = 3;

    pub const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);
    pub const CARD_SIZE: (u32, u32) = (1080, 1080);
    pub const CHART_SIZE: (u32, u32) = (1280, 720);
    pub const SHORTS_SIZE: (u32, u32) = (1080, 1920);

    pub const MIN_CARD_SLIDES: usize = 5;
    pub const MAX_CARD_SLIDES: usize = 7;

    /// Private output directory of a job
    pub fn job_dir(output_root: &Path, job_id: &str) -> PathBuf {
        output_root.join(job_id)
    }

    /// `threads/thread-NN.md`, 1-based
    pub fn thread(index: usize) -> String {
        format!("{}/thread-{:02}.md", THREADS_DIR, index)
    }

    /// `shorts-scripts/shorts-NN.md`, 1-based
    pub fn shorts_script(index: usize) -> String {
        format!("{}/shorts-{:02}.md", SHORTS_SCRIPTS_DIR, index)
    }

    /// `visuals/card-news/slide-NN.png`, 1-based
    pub fn card_slide(index: usize) -> String {
        format!("{}/slide-{:02}.png", CARD_NEWS_DIR, index)
    }

    /// `shorts-videos/shorts-NN.mp4`, 1-based
    pub fn shorts_video(index: usize) -> String {
        format!("{}/shorts-{:02}.mp4", SHORTS_VIDEOS_DIR, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ArtifactKind::from_path(Path::new("a/b.MD")), ArtifactKind::Markdown);
        assert_eq!(ArtifactKind::from_path(Path::new("x.jpeg")), ArtifactKind::Image);
        assert_eq!(ArtifactKind::from_path(Path::new("x.mp4")), ArtifactKind::Video);
        assert_eq!(ArtifactKind::from_path(Path::new("x.srt")), ArtifactKind::File);
        assert_eq!(ArtifactKind::from_path(Path::new("noext")), ArtifactKind::File);
    }

    #[test]
    fn test_layout_indices_are_two_digit() {
        assert_eq!(layout::thread(3), "threads/thread-03.md");
        assert_eq!(layout::shorts_script(1), "shorts-scripts/shorts-01.md");
        assert_eq!(layout::card_slide(7), "visuals/card-news/slide-07.png");
        assert_eq!(layout::shorts_video(2), "shorts-videos/shorts-02.mp4");
    }
}
