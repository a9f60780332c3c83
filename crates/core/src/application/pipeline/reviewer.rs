// Reviewer - re-validates the produced artifact tree and writes review-report.md

use crate::domain::{layout, Target};
use crate::error::Result;
use crate::port::{ImageInspector, ShortsGenerator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_SHORTS_DURATION_SECS: f64 = 60.5;
const MIN_SHORTS_WIDTH: u32 = 720;
const MIN_CHART_COUNT: usize = 2;

/// Report location plus the failures found by the review itself
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub report_path: PathBuf,
    pub failures: Vec<String>,
}

pub struct Reviewer {
    images: Arc<dyn ImageInspector>,
    shorts: Arc<dyn ShortsGenerator>,
}

impl Reviewer {
    pub fn new(images: Arc<dyn ImageInspector>, shorts: Arc<dyn ShortsGenerator>) -> Self {
        Self { images, shorts }
    }

    /// Check every artifact the effective `targets` require, then write the
    /// report. `failures` and `warnings` are the ones accumulated by earlier
    /// stages and are only echoed into the report.
    ///
    /// A missing artifact of a target in `failed_targets` is marked in the
    /// report but not counted again.
    pub async fn review(
        &self,
        output_dir: &Path,
        targets: &[Target],
        failed_targets: &[Target],
        failures: &[String],
        warnings: &[String],
    ) -> Result<ReviewOutcome> {
        let mut report = ReviewReport::new(failures.len(), warnings.len());

        self.check_required(output_dir, None, layout::BRIEF, &mut report).await;
        for target in targets {
            for rel in target_paths(*target) {
                let failed = failed_targets.contains(target).then_some(*target);
                self.check_required(output_dir, failed, &rel, &mut report).await;
            }
        }

        let wants = |t: Target| targets.contains(&t);

        if (wants(Target::CardNews) || wants(Target::Thumbnail))
            && exists(&output_dir.join(layout::VISUALS_DIR)).await
        {
            if wants(Target::Thumbnail) {
                self.check_thumbnail(output_dir, &mut report).await;
            }
            if wants(Target::CardNews) {
                let slides = list_files(&output_dir.join(layout::CARD_NEWS_DIR), "slide-", ".png").await;
                let count = slides.len();
                let line = format!("card-news slide count={}", count);
                if (layout::MIN_CARD_SLIDES..=layout::MAX_CARD_SLIDES).contains(&count) {
                    report.ok(&line);
                } else {
                    report.fail(&line, format!("card-news slide count mismatch ({})", count));
                }
            }
        }

        let charts_dir = output_dir.join(layout::CHARTS_DIR);
        if wants(Target::Chart) && exists(&charts_dir).await {
            self.check_charts(&charts_dir, &mut report).await;
        }

        let shorts_dir = output_dir.join(layout::SHORTS_VIDEOS_DIR);
        if wants(Target::ShortsVideos) && exists(&shorts_dir).await {
            self.check_shorts(&shorts_dir, &mut report).await;
        }

        let report_path = output_dir.join(layout::REVIEW_REPORT);
        let review_failures = report.review_failures.clone();
        tokio::fs::write(&report_path, report.render(failures, warnings)).await?;

        info!(
            report = %report_path.display(),
            review_failures = review_failures.len(),
            "Review finished"
        );
        Ok(ReviewOutcome {
            report_path,
            failures: review_failures,
        })
    }

    async fn check_required(
        &self,
        output_dir: &Path,
        failed: Option<Target>,
        rel: &str,
        report: &mut ReviewReport,
    ) {
        if is_file(&output_dir.join(rel)).await {
            report.ok(rel);
            return;
        }
        match failed {
            Some(target) => report.lines.push(format!("- [FAIL] {} ({} 실패)", rel, target)),
            None => report.fail(rel, format!("missing artifact: {}", rel)),
        }
    }

    async fn check_thumbnail(&self, output_dir: &Path, report: &mut ReviewReport) {
        let thumbnail = output_dir.join(layout::THUMBNAIL);
        // Absence was already reported by the required-path check
        if !is_file(&thumbnail).await {
            return;
        }
        match self.images.dimensions(&thumbnail) {
            Ok(size) if size == layout::THUMBNAIL_SIZE => {
                report.ok(&format!("thumbnail is {}", format_size(size)));
            }
            Ok(size) => report.fail(
                &format!("thumbnail size is {}", format_size(size)),
                format!(
                    "{} resolution mismatch: {} (expected {})",
                    layout::THUMBNAIL,
                    format_size(size),
                    format_size(layout::THUMBNAIL_SIZE)
                ),
            ),
            Err(e) => report.fail(
                &format!("thumbnail unreadable ({})", e),
                format!("{} unreadable: {}", layout::THUMBNAIL, e),
            ),
        }
    }

    async fn check_charts(&self, charts_dir: &Path, report: &mut ReviewReport) {
        let charts = list_files(charts_dir, "", ".png").await;
        let line = format!("charts count={}", charts.len());
        if charts.len() < MIN_CHART_COUNT {
            report.fail(&line, format!("charts count mismatch ({})", charts.len()));
        } else {
            report.ok(&line);
        }

        for chart in charts {
            let name = file_name(&chart);
            match self.images.dimensions(&chart) {
                Ok(size) if size == layout::CHART_SIZE => {
                    report.ok(&format!("{} is {}", name, format_size(size)));
                }
                Ok(size) => report.fail(
                    &format!("{} size is {}", name, format_size(size)),
                    format!(
                        "{} resolution mismatch (expected {})",
                        name,
                        format_size(layout::CHART_SIZE)
                    ),
                ),
                Err(e) => report.fail(
                    &format!("{} unreadable ({})", name, e),
                    format!("{} unreadable: {}", name, e),
                ),
            }
        }
    }

    async fn check_shorts(&self, shorts_dir: &Path, report: &mut ReviewReport) {
        for video in list_files(shorts_dir, "shorts-", ".mp4").await {
            let name = file_name(&video);
            let Some(probe) = self.shorts.probe(&video).await else {
                debug!(video = %name, "Probe unavailable");
                report.lines.push(format!("- [WARN] ffprobe unavailable or failed: {}", name));
                continue;
            };

            let vertical = probe.height > probe.width && probe.width >= MIN_SHORTS_WIDTH;
            if !vertical {
                report.fail(
                    &format!("{} resolution={}x{}", name, probe.width, probe.height),
                    format!("{} is not vertical video", name),
                );
            } else if probe.duration_secs > MAX_SHORTS_DURATION_SECS {
                report.fail(
                    &format!("{} duration={:.2}", name, probe.duration_secs),
                    format!("{} duration exceeds 60s", name),
                );
            } else {
                report.ok(&format!(
                    "{} {}x{}, duration={:.2}s",
                    name, probe.width, probe.height, probe.duration_secs
                ));
            }
        }
    }
}

/// Paths whose existence the effective targets imply, `brief.md` first.
pub fn required_paths(targets: &[Target]) -> Vec<String> {
    let mut paths = vec![layout::BRIEF.to_string()];
    paths.extend(targets.iter().flat_map(|t| target_paths(*t)));
    paths
}

/// Artifacts one target must leave behind.
///
/// Multi-file text targets are represented by their first file.
fn target_paths(target: Target) -> Vec<String> {
    match target {
        Target::Newsletter => vec![layout::NEWSLETTER.to_string()],
        Target::Blog => vec![layout::BLOG.to_string()],
        Target::Linkedin => vec![layout::LINKEDIN.to_string()],
        Target::YoutubeScript => vec![layout::YOUTUBE_SCRIPT.to_string()],
        Target::Threads => vec![layout::thread(1)],
        Target::ShortsScripts => vec![layout::shorts_script(1)],
        Target::Thumbnail => vec![layout::THUMBNAIL.to_string()],
        Target::CardNews => vec![layout::card_slide(1)],
        Target::Chart => vec![
            layout::CHART_OVERVIEW.to_string(),
            layout::CHART_TREND.to_string(),
        ],
        Target::ShortsVideos => vec![layout::shorts_video(1)],
    }
}

struct ReviewReport {
    lines: Vec<String>,
    review_failures: Vec<String>,
}

impl ReviewReport {
    fn new(failure_count: usize, warning_count: usize) -> Self {
        let lines = vec![
            format!("# {}", layout::REVIEW_REPORT),
            String::new(),
            "## 상태 요약".to_string(),
            format!("- 현재 실패 수: {}", failure_count),
            format!("- 경고 수: {}", warning_count),
            String::new(),
            "## 필수 산출물 검증".to_string(),
        ];
        Self {
            lines,
            review_failures: Vec::new(),
        }
    }

    fn ok(&mut self, item: &str) {
        self.lines.push(format!("- [OK] {}", item));
    }

    fn fail(&mut self, item: &str, failure: String) {
        self.lines.push(format!("- [FAIL] {}", item));
        self.review_failures.push(failure);
    }

    fn render(mut self, failures: &[String], warnings: &[String]) -> String {
        if !warnings.is_empty() {
            self.lines.push(String::new());
            self.lines.push("## 경고".to_string());
            self.lines.extend(warnings.iter().map(|w| format!("- {}", w)));
        }
        if !failures.is_empty() || !self.review_failures.is_empty() {
            self.lines.push(String::new());
            self.lines.push("## 실패/누락".to_string());
            self.lines.extend(
                failures
                    .iter()
                    .chain(self.review_failures.iter())
                    .map(|f| format!("- {}", f)),
            );
        }
        self.lines.join("\n")
    }
}

fn format_size((width, height): (u32, u32)) -> String {
    format!("{}x{}", width, height)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// A directory at an artifact path does not count as the artifact.
async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Regular files in `dir` matching `prefix*suffix`, sorted by name.
async fn list_files(dir: &Path, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return files;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && name.starts_with(prefix) && name.ends_with(suffix) {
            files.push(entry.path());
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::generators::mocks::StubShortsGenerator;
    use crate::port::image_inspector::mocks::FixedImageInspector;
    use crate::port::VideoProbe;
    use tempfile::TempDir;

    fn reviewer(images: FixedImageInspector, probe: Option<VideoProbe>) -> Reviewer {
        Reviewer::new(Arc::new(images), Arc::new(StubShortsGenerator::new(probe)))
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn test_clean_tree_has_no_fail_lines() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), layout::BLOG);
        let reviewer = reviewer(FixedImageInspector::new((1280, 720)), None);

        let outcome = reviewer
            .review(dir.path(), &[Target::Blog], &[], &[], &[])
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.starts_with("# review-report.md\n\n## 상태 요약"));
        assert!(report.contains("- [OK] brief.md"));
        assert!(report.contains("- [OK] blog.md"));
        assert!(!report.contains("[FAIL]"));
        assert!(!report.contains("## 실패/누락"));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_reported() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        let reviewer = reviewer(FixedImageInspector::new((1280, 720)), None);

        let outcome = reviewer
            .review(dir.path(), &[Target::Threads], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures, vec!["missing artifact: threads/thread-01.md"]);
    }

    #[tokio::test]
    async fn test_directory_is_not_an_artifact() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        std::fs::create_dir_all(dir.path().join(layout::BLOG)).unwrap();
        let reviewer = reviewer(FixedImageInspector::new((1280, 720)), None);

        let outcome = reviewer
            .review(dir.path(), &[Target::Blog], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures, vec!["missing artifact: blog.md"]);
        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.contains("- [FAIL] blog.md"));
    }

    #[tokio::test]
    async fn test_failed_target_is_not_counted_twice() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), layout::LINKEDIN);
        let reviewer = reviewer(FixedImageInspector::new((1280, 720)), None);

        let outcome = reviewer
            .review(
                dir.path(),
                &[Target::Blog, Target::Linkedin],
                &[Target::Blog],
                &["blog: provider down".to_string()],
                &[],
            )
            .await
            .unwrap();
        assert!(outcome.failures.is_empty());
        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.contains("- [FAIL] blog.md (blog 실패)"));
        assert!(report.contains("- [OK] linkedin.md"));
    }

    #[tokio::test]
    async fn test_thumbnail_size_mismatch_names_file_and_size() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), layout::THUMBNAIL);
        let images = FixedImageInspector::new((1280, 720)).with_override("thumbnail.png", (800, 600));
        let reviewer = reviewer(images, None);

        let outcome = reviewer
            .review(dir.path(), &[Target::Thumbnail], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].contains("visuals/thumbnail.png"));
        assert!(outcome.failures[0].contains("800x600"));
    }

    #[tokio::test]
    async fn test_card_news_slide_count_bounds() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        for i in 1..=4 {
            touch(dir.path(), &layout::card_slide(i));
        }
        let reviewer = reviewer(FixedImageInspector::new((1080, 1080)), None);

        let outcome = reviewer
            .review(dir.path(), &[Target::CardNews], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures, vec!["card-news slide count mismatch (4)"]);

        touch(dir.path(), &layout::card_slide(5));
        let outcome = reviewer
            .review(dir.path(), &[Target::CardNews], &[], &[], &[])
            .await
            .unwrap();
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_single_chart_reports_actual_count() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), layout::CHART_OVERVIEW);
        let images = FixedImageInspector::new((1280, 720)).with_override("overview.png", (640, 480));
        let reviewer = reviewer(images, None);

        let outcome = reviewer
            .review(dir.path(), &[Target::Chart], &[], &[], &[])
            .await
            .unwrap();
        assert!(outcome
            .failures
            .contains(&"missing artifact: charts/trend.png".to_string()));
        assert!(outcome.failures.contains(&"charts count mismatch (1)".to_string()));
        assert!(outcome
            .failures
            .contains(&"overview.png resolution mismatch (expected 1280x720)".to_string()));
    }

    #[tokio::test]
    async fn test_shorts_checks() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), &layout::shorts_video(1));

        let landscape = Some(VideoProbe {
            width: 1920,
            height: 1080,
            duration_secs: 30.0,
        });
        let outcome = reviewer(FixedImageInspector::new((0, 0)), landscape)
            .review(dir.path(), &[Target::ShortsVideos], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures, vec!["shorts-01.mp4 is not vertical video"]);

        let too_long = Some(VideoProbe {
            width: 1080,
            height: 1920,
            duration_secs: 61.0,
        });
        let outcome = reviewer(FixedImageInspector::new((0, 0)), too_long)
            .review(dir.path(), &[Target::ShortsVideos], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(outcome.failures, vec!["shorts-01.mp4 duration exceeds 60s"]);
    }

    #[tokio::test]
    async fn test_unavailable_probe_is_only_a_warning() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        touch(dir.path(), &layout::shorts_video(1));

        let outcome = reviewer(FixedImageInspector::new((0, 0)), None)
            .review(dir.path(), &[Target::ShortsVideos], &[], &[], &[])
            .await
            .unwrap();
        assert!(outcome.failures.is_empty());
        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.contains("- [WARN] ffprobe unavailable or failed: shorts-01.mp4"));
    }

    #[tokio::test]
    async fn test_report_echoes_prior_failures_and_warnings() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), layout::BRIEF);
        let reviewer = reviewer(FixedImageInspector::new((1280, 720)), None);

        let outcome = reviewer
            .review(
                dir.path(),
                &[],
                &[],
                &["blog: provider down".to_string()],
                &["used fallback transcription".to_string()],
            )
            .await
            .unwrap();
        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.contains("- 현재 실패 수: 1"));
        assert!(report.contains("## 경고\n- used fallback transcription"));
        assert!(report.contains("## 실패/누락\n- blog: provider down"));
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_required_paths_follow_targets() {
        let paths = required_paths(&[Target::Threads, Target::Chart]);
        assert_eq!(
            paths,
            vec![
                "brief.md",
                "threads/thread-01.md",
                "charts/overview.png",
                "charts/trend.png"
            ]
        );
    }
}
