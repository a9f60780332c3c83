// Domain Layer - Pure business logic and entities

pub mod artifact;
pub mod error;
pub mod ingestion;
pub mod job;
pub mod prompt;
pub mod target;
pub mod text;

// Re-exports
pub use artifact::{layout, Artifact, ArtifactKind};
pub use error::DomainError;
pub use ingestion::{IngestionResult, SourceType, MARKDOWN_PREFIX};
pub use job::{Job, JobId, JobStatus, Stage, MAX_RETRIES};
pub use prompt::{PromptMap, PromptTemplate, PromptVariable, VariableKind, VariableMap};
pub use target::{normalize_targets, Target, DEFAULT_TARGETS};
