// Vertical shorts clips via Whisper timestamps and ffmpeg

use crate::process::{args, CommandRunner};
use crate::transcription::{TranscriptSegment, WhisperClient};
use async_trait::async_trait;
use contentforge_core::domain::layout;
use contentforge_core::error::{AppError, Result};
use contentforge_core::port::{GeneratedAssets, ShortsGenerator, ShortsRequest, VideoProbe};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const WINDOW_SECS: f64 = 55.0;
const MIN_WINDOW_SECS: f64 = 45.0;
const HINT_CAPTION: &str = "00:00:00,000 --> 00:00:03,000";
const MOCK_SOURCE: &str = "color=c=black:s=1080x1920:d=5";

/// Clip boundaries in seconds from the source start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

/// Spread `clip_count` windows across the media, each up to 55 s and at
/// least 45 s when the media is long enough.
pub fn pick_windows(segments: &[TranscriptSegment], clip_count: usize) -> Vec<ClipWindow> {
    let duration = segments.iter().map(|s| s.end).fold(0.0_f64, f64::max);
    (0..clip_count)
        .map(|index| {
            let anchor = duration / clip_count as f64 * index as f64;
            let mut start = anchor.min((duration - WINDOW_SECS).max(0.0)).max(0.0);
            let end = duration.min(start + WINDOW_SECS);
            if end - start < MIN_WINDOW_SECS {
                start = (end - MIN_WINDOW_SECS).max(0.0);
            }
            ClipWindow { start, end }
        })
        .collect()
}

/// `HH:MM:SS,mmm`
pub fn format_srt_time(seconds: f64) -> String {
    let total = (seconds * 1000.0).round().max(0.0) as u64;
    let (hours, rest) = (total / 3_600_000, total % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Subtitles for one window, timed relative to the clip start.
///
/// A non-empty `hint` becomes a 3 s opening caption.
pub fn build_srt(segments: &[TranscriptSegment], window: ClipWindow, hint: &str) -> String {
    let mut cues: Vec<(String, String)> = Vec::new();
    if !hint.is_empty() {
        cues.push((HINT_CAPTION.to_string(), hint.to_string()));
    }
    let length = window.end - window.start;
    for segment in segments {
        if segment.end < window.start || segment.start > window.end {
            continue;
        }
        let local_start = (segment.start - window.start).max(0.0);
        let local_end = length.min(segment.end - window.start);
        if local_end <= local_start {
            continue;
        }
        cues.push((
            format!("{} --> {}", format_srt_time(local_start), format_srt_time(local_end)),
            segment.text.clone(),
        ));
    }

    let mut lines = Vec::new();
    for (index, (timing, text)) in cues.into_iter().enumerate() {
        lines.push((index + 1).to_string());
        lines.push(timing);
        lines.push(text);
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Escape a path for ffmpeg's `subtitles=` filter argument.
pub fn escape_subtitles_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace(',', "\\,")
        .replace('\'', "\\'")
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output. First stream wins.
pub fn parse_probe(stdout: &str) -> Option<VideoProbe> {
    let parsed: ProbeOutput = serde_json::from_str(stdout).ok()?;
    let stream = parsed.streams.first()?;
    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    Some(VideoProbe {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        duration_secs,
    })
}

/// First non-blank line of each `shorts-NN.md`, or "" when missing.
async fn load_script_hints(scripts_dir: &Path, clip_count: usize) -> Vec<String> {
    let mut hints = Vec::with_capacity(clip_count);
    for index in 1..=clip_count {
        let path = scripts_dir.join(format!("shorts-{:02}.md", index));
        let hint = tokio::fs::read_to_string(&path)
            .await
            .ok()
            .and_then(|text| {
                text.lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        hints.push(hint);
    }
    hints
}

fn clip_path(output_dir: &Path, index: usize, ext: &str) -> PathBuf {
    output_dir.join(format!("shorts-{:02}.{}", index, ext))
}

pub struct FfmpegShortsGenerator {
    runner: CommandRunner,
    whisper: Arc<WhisperClient>,
}

impl FfmpegShortsGenerator {
    pub fn new(runner: CommandRunner, whisper: Arc<WhisperClient>) -> Self {
        Self { runner, whisper }
    }

    async fn generate_mock(&self, request: &ShortsRequest) -> Result<GeneratedAssets> {
        let mut assets = GeneratedAssets::default();
        for index in 1..=request.clip_count {
            let output = clip_path(&request.output_dir, index, "mp4");
            let command = args([
                "-y", "-f", "lavfi", "-i", MOCK_SOURCE, "-c:v", "libx264", "-pix_fmt", "yuv420p",
            ])
            .into_iter()
            .chain([output.to_string_lossy().to_string()])
            .collect::<Vec<_>>();

            if let Err(e) = self.runner.run_checked("ffmpeg", &command).await {
                let name = output
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                warn!(file = %name, error = %e, "Mock clip render failed, writing empty file");
                tokio::fs::write(&output, b"").await?;
                assets.warnings.push(format!("{} mock 생성 실패: {}", name, e));
            }
            assets.artifacts.push(output);
        }
        Ok(assets)
    }

    async fn render_clip(
        &self,
        video: &Path,
        output: &Path,
        srt: &Path,
        window: ClipWindow,
    ) -> Result<()> {
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},subtitles='{srt}'",
            w = layout::SHORTS_SIZE.0,
            h = layout::SHORTS_SIZE.1,
            srt = escape_subtitles_path(srt),
        );
        let command = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", window.start),
            "-to".to_string(),
            format!("{:.3}", window.end),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-vf".to_string(),
            filter,
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.to_string_lossy().to_string(),
        ];
        self.runner.run_checked("ffmpeg", &command).await?;
        Ok(())
    }
}

#[async_trait]
impl ShortsGenerator for FfmpegShortsGenerator {
    async fn generate_assets(&self, request: &ShortsRequest) -> Result<GeneratedAssets> {
        tokio::fs::create_dir_all(&request.output_dir).await?;
        if request.mock {
            return self.generate_mock(request).await;
        }

        let video = match &request.video_path {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => path.clone(),
            _ => {
                return Err(AppError::Execution(format!(
                    "쇼츠 생성용 원본 영상을 찾을 수 없습니다: {}",
                    request.source_ref
                )))
            }
        };

        let transcript = self.whisper.transcribe(&video).await?;
        if transcript.segments.is_empty() {
            return Err(AppError::Execution(
                "타임스탬프 전사 결과가 비어 있어 쇼츠 구간을 선정할 수 없습니다.".into(),
            ));
        }

        let hints = load_script_hints(&request.scripts_dir, request.clip_count).await;
        let windows = pick_windows(&transcript.segments, request.clip_count);
        let mut assets = GeneratedAssets::default();
        for (offset, window) in windows.into_iter().enumerate() {
            let index = offset + 1;
            let srt = clip_path(&request.output_dir, index, "srt");
            let hint = hints.get(offset).map(String::as_str).unwrap_or_default();
            tokio::fs::write(&srt, build_srt(&transcript.segments, window, hint)).await?;

            let output = clip_path(&request.output_dir, index, "mp4");
            self.render_clip(&video, &output, &srt, window).await?;
            info!(clip = index, start = window.start, end = window.end, "Shorts clip rendered");
            assets.artifacts.push(output);
        }
        Ok(assets)
    }

    async fn probe(&self, video_path: &Path) -> Option<VideoProbe> {
        let command = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "stream=width,height:format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            video_path.to_string_lossy().to_string(),
        ];
        match self.runner.run("ffprobe", &command).await {
            Ok(out) if out.success => parse_probe(&out.stdout),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "ffprobe unavailable");
                None
            }
        }
    }
}
