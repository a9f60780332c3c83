// Application error type shared by every crate in the workspace

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Bad API input (sources, targets, artifact paths, prompt edits)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Cancel/retry raced with the worker or hit a retry rule
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Text, image or transcription provider failure after retries
    #[error("Provider error: {0}")]
    Provider(#[from] crate::port::ProviderError),

    /// External tool (ffmpeg, ffprobe, yt-dlp) or ingestion failure
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Message without the variant prefix, for job records and RPC errors.
    pub fn detail(&self) -> String {
        match self {
            AppError::Validation(m)
            | AppError::Database(m)
            | AppError::Config(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::InvalidState(m)
            | AppError::Execution(m)
            | AppError::Internal(m) => m.clone(),
            AppError::Domain(e) => e.to_string(),
            AppError::Io(e) => e.to_string(),
            AppError::Serialization(e) => e.to_string(),
            AppError::Provider(e) => e.to_string(),
        }
    }
}
