// Port Layer - Interfaces for external dependencies

pub mod generators;
pub mod id_provider; // For deterministic testing
pub mod image_inspector;
pub mod ingestor;
pub mod job_repository;
pub mod prompt_store;
pub mod text_provider;
pub mod time_provider;

// Re-exports
pub use generators::{
    ChartGenerator, GeneratedAssets, ShortsGenerator, ShortsRequest, VideoProbe, VisualGenerator,
};
pub use id_provider::{IdProvider, UuidProvider};
pub use image_inspector::ImageInspector;
pub use ingestor::Ingestor;
pub use job_repository::{JobPatch, JobRepository};
pub use prompt_store::PromptStore;
pub use text_provider::{ProviderError, TextProvider, DEFAULT_MAX_TOKENS};
pub use time_provider::{SystemTimeProvider, TimeProvider};
