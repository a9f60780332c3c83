// Card-news and thumbnail generation with local fallback rendering

use crate::gemini::ImageApiClient;
use crate::imaging::{fit_cover_png, placeholder, save_png, write_bytes};
use ab_glyph::FontArc;
use async_trait::async_trait;
use contentforge_core::application::pipeline::key_messages_from_brief;
use contentforge_core::application::worker::constants::KEY_MESSAGE_COUNT;
use contentforge_core::domain::prompt::{keys, prompt_or_default, render};
use contentforge_core::domain::{layout, PromptMap};
use contentforge_core::error::Result;
use contentforge_core::port::{GeneratedAssets, VisualGenerator};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_TOPIC: &str = "입력 원문의 핵심 주제";
const DEFAULT_BODY_MESSAGE: &str = "핵심 메시지를 시각적으로 전달";
const DEFAULT_THUMBNAIL_TOPIC: &str = "마케팅 자동화 핵심 포인트";

/// Where a slide sits in the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlideRole {
    Cover,
    Body,
    Cta,
    Thumbnail,
}

impl SlideRole {
    fn stage(&self) -> &'static str {
        match self {
            SlideRole::Cover => "cover",
            SlideRole::Body => "body",
            SlideRole::Cta => "cta",
            SlideRole::Thumbnail => "thumbnail",
        }
    }

    fn prompt_key(&self) -> &'static str {
        match self {
            SlideRole::Cover => keys::VISUAL_CARD_COVER,
            SlideRole::Body => keys::VISUAL_CARD_BODY,
            SlideRole::Cta => keys::VISUAL_CARD_CTA,
            SlideRole::Thumbnail => keys::VISUAL_THUMBNAIL,
        }
    }
}

/// Cover, one body slide per message, CTA; clamped to 5..=7 slides.
pub fn slide_count(message_count: usize) -> usize {
    (message_count + 2).clamp(layout::MIN_CARD_SLIDES, layout::MAX_CARD_SLIDES)
}

/// Role and grounding message of slide `index` (0-based).
fn slide_plan(index: usize, messages: &[String]) -> (SlideRole, String) {
    let topic = messages.first().map(String::as_str).unwrap_or(DEFAULT_TOPIC);
    if index == 0 {
        return (SlideRole::Cover, topic.to_string());
    }
    if index == messages.len() + 1 {
        let last = messages.last().map(String::as_str).unwrap_or(topic);
        return (SlideRole::Cta, last.to_string());
    }
    let message = if messages.is_empty() {
        DEFAULT_BODY_MESSAGE
    } else {
        let at = (index - 1).min(messages.len() - 1);
        messages[at].as_str()
    };
    (SlideRole::Body, message.to_string())
}

/// Render the role's template and append source grounding lines.
fn compose_prompt(prompts: &PromptMap, role: SlideRole, topic: &str, message: &str) -> String {
    let topic = match topic.trim() {
        "" => DEFAULT_TOPIC,
        t => t,
    };
    let message = match message.trim() {
        "" => topic,
        m => m,
    };
    let values: HashMap<String, String> = [
        ("topic", topic),
        ("message", message),
        ("stage", role.stage()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let base = render(prompt_or_default(prompts, role.prompt_key()), &values);
    format!(
        "{base}\n\n\
Source grounding:\n\
- Topic: {topic}\n\
- Core message: {message}\n\
- Stage: {stage}\n\
- On-image Korean copy must be created only from Topic/Core message.\n\
- Never print planning or instruction text in the final image.",
        stage = role.stage(),
    )
}

pub struct ImageVisualGenerator {
    api: Arc<ImageApiClient>,
    font: Option<FontArc>,
}

impl ImageVisualGenerator {
    pub fn new(api: Arc<ImageApiClient>, font: Option<FontArc>) -> Self {
        Self { api, font }
    }

    /// Write one image, falling back to a local placeholder on any failure.
    async fn write_image(
        &self,
        prompt: &str,
        path: &Path,
        (width, height): (u32, u32),
        mock: bool,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        if mock {
            return save_png(&placeholder(width, height, prompt, self.font.as_ref()), path).await;
        }

        let generated = match self.api.generate_visual(prompt, width, height).await {
            Ok(bytes) => fit_cover_png(&bytes, width, height),
            Err(e) => Err(e.into()),
        };
        match generated {
            Ok(png) => write_bytes(path, &png).await,
            Err(e) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                warn!(file = %name, error = %e, "Image generation failed, using fallback");
                let text = format!("{}\n\nFallback: {}", prompt, e);
                save_png(&placeholder(width, height, &text, self.font.as_ref()), path).await?;
                warnings.push(format!(
                    "{} 생성 실패로 fallback 이미지를 생성했습니다: {}",
                    name, e
                ));
                Ok(())
            }
        }
    }
}

#[async_trait]
impl VisualGenerator for ImageVisualGenerator {
    async fn generate_assets(
        &self,
        brief: &str,
        output_dir: &Path,
        prompts: &PromptMap,
        mock: bool,
        want_card_news: bool,
        want_thumbnail: bool,
    ) -> Result<GeneratedAssets> {
        let messages = key_messages_from_brief(brief, KEY_MESSAGE_COUNT);
        let mut assets = GeneratedAssets::default();

        if want_card_news {
            let topic = messages.first().map(String::as_str).unwrap_or(DEFAULT_TOPIC);
            let count = slide_count(messages.len());
            for index in 0..count {
                let (role, message) = slide_plan(index, &messages);
                let prompt = compose_prompt(prompts, role, topic, &message);
                let path = output_dir.join(layout::card_slide(index + 1));
                self.write_image(&prompt, &path, layout::CARD_SIZE, mock, &mut assets.warnings)
                    .await?;
                assets.artifacts.push(path);
            }
            info!(slides = count, mock, "Card-news slides written");
        }

        if want_thumbnail {
            let topic = messages
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_THUMBNAIL_TOPIC);
            let prompt = compose_prompt(prompts, SlideRole::Thumbnail, topic, topic);
            let path = output_dir.join(layout::THUMBNAIL);
            self.write_image(&prompt, &path, layout::THUMBNAIL_SIZE, mock, &mut assets.warnings)
                .await?;
            assets.artifacts.push(path);
        }

        Ok(assets)
    }
}
