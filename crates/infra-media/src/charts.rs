// Overview (bar) and trend (line) charts

use crate::gemini::ImageApiClient;
use crate::imaging::{draw_label, resize_exact_png, save_png, write_bytes, WHITE};
use ab_glyph::FontArc;
use async_trait::async_trait;
use contentforge_core::application::pipeline::key_messages_from_brief;
use contentforge_core::application::worker::constants::KEY_MESSAGE_COUNT;
use contentforge_core::domain::prompt::{keys, prompt_or_default};
use contentforge_core::domain::text::shorten;
use contentforge_core::domain::{layout, PromptMap};
use contentforge_core::error::Result;
use contentforge_core::port::{ChartGenerator, GeneratedAssets};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const NO_MESSAGE: &str = "핵심 메시지를 추출하지 못했습니다.";
const LABEL_WIDTH: usize = 36;
const POINT_LABEL_WIDTH: usize = 12;
const TITLE_SCALE: f32 = 34.0;
const LABEL_SCALE: f32 = 22.0;

/// A shortened message label and its 16..=98 score
pub type Score = (String, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartKind {
    Overview,
    Trend,
}

impl ChartKind {
    fn name(&self) -> &'static str {
        match self {
            ChartKind::Overview => "overview",
            ChartKind::Trend => "trend",
        }
    }
}

/// Score each message by length and rank position.
pub fn score_messages(messages: &[String]) -> Vec<Score> {
    messages
        .iter()
        .take(KEY_MESSAGE_COUNT)
        .enumerate()
        .map(|(index, message)| {
            let len = message.chars().count() as i32;
            let score = (len + 28 - 4 * index as i32).clamp(16, 98);
            (shorten(message, LABEL_WIDTH, "..."), score)
        })
        .collect()
}

/// One-line verdict on the first-to-last score delta.
pub fn trend_summary(scores: &[Score]) -> String {
    let (Some(first), Some(last)) = (scores.first(), scores.last()) else {
        return "데이터가 부족해 추세를 단정할 수 없습니다.".to_string();
    };
    if scores.len() < 2 {
        return "데이터가 부족해 추세를 단정할 수 없습니다.".to_string();
    }
    let delta = last.1 - first.1;
    if delta >= 10 {
        format!("추세 판단: 상승(+{}) - 실행 확장 우선", delta)
    } else if delta <= -10 {
        format!("추세 판단: 하락({}) - 리스크 대응 우선", delta)
    } else {
        format!("추세 판단: 보합({:+}) - 점진적 최적화", delta)
    }
}

fn chart_prompt(kind: ChartKind, title: &str, scores: &[Score]) -> String {
    let (shape, emphasis, lines) = match kind {
        ChartKind::Overview => (
            "bar",
            "clear axis/legend",
            scores
                .iter()
                .map(|(label, score)| format!("- {}: {}", label, score))
                .collect::<Vec<_>>(),
        ),
        ChartKind::Trend => (
            "line",
            "clear trend emphasis",
            scores
                .iter()
                .enumerate()
                .map(|(i, (label, score))| format!("- Point {}: {} = {}", i + 1, label, score))
                .collect::<Vec<_>>(),
        ),
    };
    format!(
        "Create a clean 16:9 business dashboard {shape} chart image.\n\
Title: {title}\n\
Language for on-image text: Korean.\n\
Data:\n\
{data}\n\
Constraints:\n\
- Show only chart/title/labels from provided data.\n\
- Do not include prompt, instruction, API, or meta text.\n\
- High readability, ERP report style, {emphasis}.\n\
- PNG image output.",
        data = lines.join("\n"),
    )
}

fn header_band(image: &mut RgbImage, color: Rgb<u8>, title: &str, font: Option<&FontArc>) {
    let width = image.width();
    draw_filled_rect_mut(image, Rect::at(0, 0).of_size(width, 88), color);
    draw_label(image, font, 32, 26, title, WHITE, TITLE_SCALE);
}

/// Horizontal bars, one per scored message.
pub fn draw_bar_chart(title: &str, scores: &[Score], font: Option<&FontArc>) -> RgbImage {
    let (width, height) = layout::CHART_SIZE;
    let mut image = RgbImage::from_pixel(width, height, Rgb([247, 250, 252]));
    header_band(&mut image, Rgb([14, 52, 90]), title, font);

    let left = 80i32;
    let top = 140i32;
    let chart_width = 1120i32;
    let bar_height = 72u32;
    let gap = 28i32;
    let axis = Rgb([150, 167, 184]);
    let text = Rgb([27, 37, 48]);
    let bottom = height as f32 - 60.0;

    draw_line_segment_mut(&mut image, (left as f32, (top - 10) as f32), (left as f32, bottom), axis);
    draw_line_segment_mut(
        &mut image,
        (left as f32, bottom),
        ((left + chart_width) as f32, bottom),
        axis,
    );

    for (index, (label, score)) in scores.iter().enumerate() {
        let i = index as i32;
        let y = top + i * (bar_height as i32 + gap);
        let bar_width = ((chart_width - 220) * score / 100).max(1) as u32;
        let color = Rgb([30, (120 + i * 18).min(255) as u8, (190 - i * 12).max(0) as u8]);
        draw_filled_rect_mut(
            &mut image,
            Rect::at(left + 160, y).of_size(bar_width, bar_height),
            color,
        );
        draw_label(&mut image, font, left, y + 24, &format!("{}. {}", index + 1, label), text, LABEL_SCALE);
        draw_label(
            &mut image,
            font,
            left + 170 + bar_width as i32,
            y + 24,
            &score.to_string(),
            text,
            LABEL_SCALE,
        );
    }
    image
}

/// Line through the scores in rank order, with a trend verdict underneath.
pub fn draw_line_chart(title: &str, scores: &[Score], font: Option<&FontArc>) -> RgbImage {
    let (width, height) = layout::CHART_SIZE;
    let mut image = RgbImage::from_pixel(width, height, Rgb([253, 252, 248]));
    header_band(&mut image, Rgb([66, 45, 114]), title, font);

    let left = 110i32;
    let right = width as i32 - 90;
    let top = 140i32;
    let bottom = height as i32 - 90;
    let text = Rgb([40, 33, 53]);

    draw_hollow_rect_mut(
        &mut image,
        Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32),
        Rgb([190, 184, 210]),
    );
    for i in 1..5 {
        let y = (top + (bottom - top) / 5 * i) as f32;
        draw_line_segment_mut(&mut image, (left as f32, y), (right as f32, y), Rgb([228, 224, 238]));
    }

    let placeholder: Vec<Score> = [30, 40, 50]
        .iter()
        .map(|&s| ("No Data".to_string(), s))
        .collect();
    let scores = if scores.is_empty() { &placeholder[..] } else { scores };

    let span = (scores.len() as i32 - 1).max(1);
    let points: Vec<(i32, i32)> = scores
        .iter()
        .enumerate()
        .map(|(i, (_, score))| {
            let x = left + (right - left) * i as i32 / span;
            let y = bottom - (bottom - top) * (*score).clamp(0, 100) / 100;
            (x, y)
        })
        .collect();

    let stroke = Rgb([87, 95, 214]);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        // 4px stroke
        for offset in -2..2 {
            draw_line_segment_mut(
                &mut image,
                (a.0 as f32, (a.1 + offset) as f32),
                (b.0 as f32, (b.1 + offset) as f32),
                stroke,
            );
        }
    }
    for (index, &(x, y)) in points.iter().enumerate() {
        draw_filled_circle_mut(&mut image, (x, y), 10, WHITE);
        draw_filled_circle_mut(&mut image, (x, y), 8, Rgb([247, 112, 93]));
        let (label, score) = &scores[index];
        draw_label(
            &mut image,
            font,
            x - 46,
            (bottom + 14).min(y + 20),
            &shorten(label, POINT_LABEL_WIDTH, "..."),
            text,
            LABEL_SCALE,
        );
        draw_label(&mut image, font, x - 8, (top - 26).max(y - 24), &score.to_string(), text, LABEL_SCALE);
    }

    draw_label(&mut image, font, left, bottom + 34, &trend_summary(scores), Rgb([67, 60, 85]), LABEL_SCALE);
    image
}

pub struct ImageChartGenerator {
    api: Arc<ImageApiClient>,
    font: Option<FontArc>,
}

impl ImageChartGenerator {
    pub fn new(api: Arc<ImageApiClient>, font: Option<FontArc>) -> Self {
        Self { api, font }
    }

    fn render_local(&self, kind: ChartKind, title: &str, scores: &[Score]) -> RgbImage {
        match kind {
            ChartKind::Overview => draw_bar_chart(title, scores, self.font.as_ref()),
            ChartKind::Trend => draw_line_chart(title, scores, self.font.as_ref()),
        }
    }

    async fn write_chart(
        &self,
        kind: ChartKind,
        path: &Path,
        title: &str,
        scores: &[Score],
        mock: bool,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        if !mock {
            let (width, height) = layout::CHART_SIZE;
            let prompt = chart_prompt(kind, title, scores);
            let generated = match self.api.generate_chart(&prompt).await {
                Ok(bytes) => resize_exact_png(&bytes, width, height),
                Err(e) => Err(e.into()),
            };
            match generated {
                Ok(png) => return write_bytes(path, &png).await,
                Err(e) => {
                    warn!(chart = kind.name(), error = %e, "Chart generation failed, drawing locally");
                    warnings.push(format!(
                        "chart {} Gemini 생성 실패, fallback 사용: {}",
                        kind.name(),
                        e
                    ));
                }
            }
        }
        save_png(&self.render_local(kind, title, scores), path).await
    }
}

#[async_trait]
impl ChartGenerator for ImageChartGenerator {
    async fn generate_assets(
        &self,
        brief: &str,
        output_dir: &Path,
        prompts: &PromptMap,
        mock: bool,
    ) -> Result<GeneratedAssets> {
        let mut messages = key_messages_from_brief(brief, KEY_MESSAGE_COUNT);
        if messages.is_empty() {
            messages.push(NO_MESSAGE.to_string());
        }
        let scores = score_messages(&messages);

        let mut assets = GeneratedAssets::default();
        let charts = [
            (
                ChartKind::Overview,
                layout::CHART_OVERVIEW,
                prompt_or_default(prompts, keys::CHART_OVERVIEW_TITLE),
            ),
            (
                ChartKind::Trend,
                layout::CHART_TREND,
                prompt_or_default(prompts, keys::CHART_TREND_TITLE),
            ),
        ];
        for (kind, rel, title) in charts {
            let path = output_dir.join(rel);
            self.write_chart(kind, &path, title.trim(), &scores, mock, &mut assets.warnings)
                .await?;
            assets.artifacts.push(path);
        }

        info!(points = scores.len(), mock, "Charts written");
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::ImageApiConfig;
    use std::time::Duration;

    fn generator() -> ImageChartGenerator {
        let api = ImageApiClient::new(ImageApiConfig {
            api_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        ImageChartGenerator::new(Arc::new(api), None)
    }

    #[test]
    fn test_scores_are_clamped_and_decay_by_rank() {
        let messages = vec![
            "a".repeat(200),
            "짧음".to_string(),
            "x".repeat(20),
        ];
        let scores = score_messages(&messages);
        assert_eq!(scores[0].1, 98);
        // 2 + 28 - 4
        assert_eq!(scores[1].1, 26);
        // 20 + 28 - 8
        assert_eq!(scores[2].1, 40);
        assert!(scores[0].0.ends_with("..."));
        assert!(scores[0].0.chars().count() <= LABEL_WIDTH);
    }

    #[test]
    fn test_scores_floor_at_sixteen() {
        let messages: Vec<String> = (0..5).map(|_| String::new()).collect();
        assert!(score_messages(&messages).iter().all(|(_, s)| *s == 16));
    }

    #[test]
    fn test_trend_summary_bands() {
        let s = |v: &[i32]| v.iter().map(|&x| ("m".to_string(), x)).collect::<Vec<_>>();
        assert!(trend_summary(&s(&[20, 40])).contains("상승(+20)"));
        assert!(trend_summary(&s(&[60, 40])).contains("하락(-20)"));
        assert!(trend_summary(&s(&[40, 45])).contains("보합(+5)"));
        assert!(trend_summary(&s(&[40])).contains("데이터가 부족"));
    }

    #[test]
    fn test_local_charts_are_chart_sized() {
        let scores = score_messages(&["하나".to_string(), "둘".to_string()]);
        assert_eq!(draw_bar_chart("t", &scores, None).dimensions(), (1280, 720));
        assert_eq!(draw_line_chart("t", &[], None).dimensions(), (1280, 720));
    }

    #[tokio::test]
    async fn test_mock_writes_two_charts_without_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let assets = generator()
            .generate_assets("## 핵심 메시지\n- 매출 성장 20%\n", dir.path(), &PromptMap::new(), true)
            .await
            .unwrap();

        assert_eq!(assets.artifacts.len(), 2);
        assert!(assets.warnings.is_empty());
        for rel in [layout::CHART_OVERVIEW, layout::CHART_TREND] {
            assert_eq!(image::image_dimensions(dir.path().join(rel)).unwrap(), (1280, 720));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_api_falls_back_per_chart() {
        let dir = tempfile::tempdir().unwrap();
        let assets = generator()
            .generate_assets("", dir.path(), &PromptMap::new(), false)
            .await
            .unwrap();

        assert_eq!(assets.artifacts.len(), 2);
        assert_eq!(assets.warnings.len(), 2);
        assert!(assets.warnings[0].starts_with("chart overview"));
        assert!(dir.path().join(layout::CHART_TREND).exists());
    }
}
