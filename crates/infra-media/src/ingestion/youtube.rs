// YouTube ingestion via yt-dlp (subtitles, Whisper transcript, metadata fallback)

use crate::process::{args, CommandRunner};
use crate::transcription::WhisperClient;
use contentforge_core::domain::{IngestionResult, SourceType};
use contentforge_core::error::{AppError, Result};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

const DEFAULT_TITLE: &str = "Untitled YouTube source";
const YOUTUBE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "www.youtu.be",
];

static TIMECODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}:\d{2}(:\d{2})?\.\d{3}\s+-->\s+\d{2}:\d{2}(:\d{2})?\.\d{3}")
        .expect("valid timecode regex")
});
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid inline tag regex"));

pub fn is_youtube_url(source_ref: &str) -> bool {
    Url::parse(source_ref)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| YOUTUBE_HOSTS.contains(&host.as_str()))
}

#[derive(Debug, Default, Deserialize)]
struct VideoMetadata {
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

/// Caption text of a WebVTT document, one cue line per output line.
///
/// Auto-generated captions repeat the previous cue line, so consecutive
/// duplicates are collapsed.
pub fn vtt_to_text(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in vtt.lines() {
        let raw = line.trim();
        if raw.is_empty()
            || raw == "WEBVTT"
            || raw.starts_with("Kind:")
            || raw.starts_with("Language:")
            || raw.chars().all(|c| c.is_ascii_digit())
            || TIMECODE.is_match(raw)
        {
            continue;
        }
        let cleaned = INLINE_TAG.replace_all(raw, "").trim().to_string();
        if cleaned.is_empty() || lines.last() == Some(&cleaned) {
            continue;
        }
        lines.push(cleaned);
    }
    lines.join("\n")
}

/// Korean captions first, then English, then whatever was written.
fn pick_subtitle(dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "vtt"))
        .collect();
    files.sort();
    let named = |lang: &str| {
        files
            .iter()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains(&format!(".{}.", lang)))
            })
            .cloned()
    };
    named("ko").or_else(|| named("en")).or_else(|| files.first().cloned())
}

pub struct YoutubeIngestor {
    runner: CommandRunner,
    whisper: Arc<WhisperClient>,
    program: String,
}

impl YoutubeIngestor {
    pub fn new(runner: CommandRunner, whisper: Arc<WhisperClient>) -> Self {
        Self {
            runner,
            whisper,
            program: "yt-dlp".to_string(),
        }
    }

    /// Override the yt-dlp executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn metadata(&self, url: &str) -> Result<VideoMetadata> {
        let output = self
            .runner
            .run_checked(
                &self.program,
                &args(["--dump-single-json", "--no-warnings", url]),
            )
            .await?;
        if output.stdout.trim().is_empty() {
            return Ok(VideoMetadata::default());
        }
        Ok(serde_json::from_str(&output.stdout)?)
    }

    async fn subtitle_text(&self, url: &str, workdir: &Path) -> Result<String> {
        let subs_dir = workdir.join("subs");
        tokio::fs::create_dir_all(&subs_dir).await?;
        let template = subs_dir.join("%(id)s.%(ext)s").to_string_lossy().into_owned();

        // Missing captions are not an error here
        let output = self
            .runner
            .run(
                &self.program,
                &args([
                    "--skip-download",
                    "--write-auto-subs",
                    "--sub-langs",
                    "ko,en",
                    "--sub-format",
                    "vtt",
                    "-o",
                    template.as_str(),
                    url,
                ]),
            )
            .await?;
        if !output.success {
            warn!(url = %url, exit_code = ?output.exit_code, "Subtitle download failed");
        }

        let Some(path) = pick_subtitle(&subs_dir) else {
            return Ok(String::new());
        };
        let bytes = tokio::fs::read(&path).await?;
        Ok(vtt_to_text(&String::from_utf8_lossy(&bytes)))
    }

    async fn download_video(&self, url: &str, workdir: &Path) -> Result<PathBuf> {
        let video_dir = workdir.join("video");
        tokio::fs::create_dir_all(&video_dir).await?;
        let template = video_dir.join("source.%(ext)s").to_string_lossy().into_owned();
        self.runner
            .run_checked(
                &self.program,
                &args(["-f", "mp4/best", "-o", template.as_str(), url]),
            )
            .await?;

        let mut entries = tokio::fs::read_dir(&video_dir).await?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("source."))
            {
                candidates.push(path);
            }
        }
        candidates.sort();
        candidates.into_iter().next().ok_or_else(|| {
            AppError::Execution("다운로드된 영상 파일을 찾을 수 없습니다.".into())
        })
    }

    async fn transcribe(&self, url: &str, workdir: &Path) -> (Option<PathBuf>, Result<String>) {
        let video = match self.download_video(url, workdir).await {
            Ok(path) => path,
            Err(e) => return (None, Err(e)),
        };
        let text = self.whisper.transcribe_text(&video).await;
        (Some(video), text)
    }

    pub async fn ingest(&self, url: &str, workdir: &Path) -> Result<IngestionResult> {
        let metadata = self.metadata(url).await?;
        let title = metadata
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let mut warnings = Vec::new();

        let mut text = match self.subtitle_text(url, workdir).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %url, error = %e, "Subtitle extraction failed");
                String::new()
            }
        };

        let mut video_path = None;
        if text.is_empty() {
            let (video, transcript) = self.transcribe(url, workdir).await;
            video_path = video;
            match transcript {
                Ok(transcript) => {
                    text = transcript;
                    warnings
                        .push("공식 자막 추출 실패로 Whisper 전사 결과를 사용했습니다.".to_string());
                }
                Err(e) => warnings.push(format!("Whisper 전사 실패: {}", e)),
            }
        }

        if video_path.is_none() {
            match self.download_video(url, workdir).await {
                Ok(path) => video_path = Some(path),
                Err(e) => warnings.push(format!("쇼츠용 영상 다운로드 실패: {}", e)),
            }
        }

        if text.is_empty() {
            let description = metadata.description.unwrap_or_default();
            text = format!("{}\n\n{}", title, description).trim().to_string();
            warnings.push(
                "자막/전사 추출 실패로 메타데이터 기반 요약 모드를 사용했습니다.".to_string(),
            );
        }

        info!(
            url = %url,
            text_chars = text.chars().count(),
            has_video = video_path.is_some(),
            warnings = warnings.len(),
            "Ingested YouTube source"
        );

        let mut result = IngestionResult::new(SourceType::Youtube, title, text)
            .with_metadata("url", url)
            .with_metadata("channel", metadata.channel.unwrap_or_default());
        result.video_path = video_path;
        result.warnings = warnings;
        Ok(result)
    }
}
