// ContentForge Infrastructure - Media Adapters
// Implements: Ingestor, TextProvider, VisualGenerator, ChartGenerator,
// ShortsGenerator, ImageInspector

pub mod charts;
pub mod gemini;
pub mod http;
pub mod image_inspector;
pub mod imaging;
pub mod ingestion;
pub mod process;
pub mod shorts;
pub mod text;
pub mod transcription;
pub mod visuals;

pub use charts::ImageChartGenerator;
pub use gemini::{ImageApiClient, ImageApiConfig, DEFAULT_IMAGE_MODEL};
pub use image_inspector::FileImageInspector;
pub use imaging::load_font;
pub use ingestion::{SourceIngestor, WebIngestor, YoutubeIngestor};
pub use process::CommandRunner;
pub use shorts::FfmpegShortsGenerator;
pub use text::{
    default_chain, AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider,
};
pub use transcription::{WhisperClient, WhisperConfig};
pub use visuals::ImageVisualGenerator;
