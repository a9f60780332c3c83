// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unsupported targets: {0}")]
    UnsupportedTargets(String),

    #[error("At least one target is required")]
    EmptyTargets,

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Retry limit reached ({0})")]
    RetryLimitReached(u32),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
