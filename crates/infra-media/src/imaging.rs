// Local image rendering helpers (fallback images, chart canvases)

use ab_glyph::{FontArc, PxScale};
use contentforge_core::error::{AppError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::io::Cursor;
use std::path::Path;
use tracing::warn;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const PLACEHOLDER_BACKGROUND: Rgb<u8> = Rgb([36, 50, 77]);
const PLACEHOLDER_WRAP: usize = 32;
const PLACEHOLDER_MARGIN: i32 = 40;
const TEXT_SCALE: f32 = 28.0;
const LINE_SPACING: i32 = 8;

/// Load a TrueType/OpenType font. Empty path or unreadable file yields None
/// and text is skipped when drawing.
pub fn load_font(path: &str) -> Option<FontArc> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(font_path = %path, error = %e, "Font not readable, rendering without text");
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(font_path = %path, error = %e, "Font not parseable, rendering without text");
            None
        }
    }
}

/// Greedy word wrap at `width` chars. Over-long words are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut used = 0usize;
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(width) {
                let len = chunk.len();
                let extra = usize::from(used > 0);
                if used + extra + len > width {
                    lines.push(std::mem::take(&mut line));
                    used = 0;
                }
                if used > 0 {
                    line.push(' ');
                    used += 1;
                }
                line.extend(chunk);
                used += len;
            }
        }
        lines.push(line);
    }
    lines
}

/// Draw `lines` top-down starting at (x, y). No-op without a font.
pub fn draw_lines(
    image: &mut RgbImage,
    font: Option<&FontArc>,
    x: i32,
    y: i32,
    lines: &[String],
    color: Rgb<u8>,
    scale: f32,
) {
    let Some(font) = font else {
        return;
    };
    let step = scale as i32 + LINE_SPACING;
    for (index, line) in lines.iter().enumerate() {
        let top = y + step * index as i32;
        if top >= image.height() as i32 {
            break;
        }
        draw_text_mut(image, color, x, top, PxScale::from(scale), font, line);
    }
}

/// Single line of text. No-op without a font.
pub fn draw_label(
    image: &mut RgbImage,
    font: Option<&FontArc>,
    x: i32,
    y: i32,
    text: &str,
    color: Rgb<u8>,
    scale: f32,
) {
    if let Some(font) = font {
        draw_text_mut(image, color, x, y, PxScale::from(scale), font, text);
    }
}

/// Flat placeholder with the intended prompt printed on it.
pub fn placeholder(width: u32, height: u32, text: &str, font: Option<&FontArc>) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, PLACEHOLDER_BACKGROUND);
    let lines = wrap(text, PLACEHOLDER_WRAP);
    draw_lines(
        &mut image,
        font,
        PLACEHOLDER_MARGIN,
        PLACEHOLDER_MARGIN,
        &lines,
        WHITE,
        TEXT_SCALE,
    );
    image
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AppError::Execution(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Encode and write, creating parent directories.
pub async fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    let bytes = encode_png(image)?;
    write_bytes(path, &bytes).await
}

pub async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| AppError::Execution(format!("unreadable image payload: {}", e)))
}

/// Scale to cover `width`x`height`, center-crop the overflow, encode PNG.
pub fn fit_cover_png(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let fitted = decode(bytes)?
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .to_rgb8();
    encode_png(&fitted)
}

/// Stretch to exactly `width`x`height`, encode PNG.
pub fn resize_exact_png(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let resized = decode(bytes)?
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8();
    encode_png(&resized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width_and_paragraphs() {
        let lines = wrap("aaa bbb ccc\nddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "ddd"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_counts_chars_not_bytes() {
        let lines = wrap("가나다 라마바", 3);
        assert_eq!(lines, vec!["가나다", "라마바"]);
    }

    #[test]
    fn test_placeholder_without_font_has_requested_size() {
        let image = placeholder(1080, 1080, "prompt text", None);
        assert_eq!(image.dimensions(), (1080, 1080));
        assert_eq!(*image.get_pixel(0, 0), PLACEHOLDER_BACKGROUND);
    }

    #[test]
    fn test_fit_cover_produces_target_size() {
        let source = RgbImage::from_pixel(400, 100, Rgb([10, 20, 30]));
        let png = encode_png(&source).unwrap();

        let fitted = fit_cover_png(&png, 128, 72).unwrap();
        let decoded = image::load_from_memory(&fitted).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 72));

        let stretched = resize_exact_png(&png, 64, 64).unwrap();
        let decoded = image::load_from_memory(&stretched).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn test_garbage_payload_is_error() {
        assert!(fit_cover_png(b"not an image", 10, 10).is_err());
    }

    #[test]
    fn test_missing_font_is_none() {
        assert!(load_font("").is_none());
        assert!(load_font("/nonexistent/font.ttf").is_none());
    }
}
