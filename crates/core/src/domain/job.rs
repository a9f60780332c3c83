// Job Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::target::Target;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job ID (UUID v4)
pub type JobId = String;

/// Only one retry is allowed per job.
pub const MAX_RETRIES: u32 = 1;

/// Upper bound on failure lines kept in `error_message`.
pub const MAX_ERROR_LINES: usize = 20;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    PartialSuccess,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::PartialSuccess => "PARTIAL_SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "RUNNING" => Some(JobStatus::Running),
            "SUCCEEDED" => Some(JobStatus::Succeeded),
            "PARTIAL_SUCCESS" => Some(JobStatus::PartialSuccess),
            "FAILED" => Some(JobStatus::Failed),
            "CANCELED" => Some(JobStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::PartialSuccess)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage, in nominal execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Queued,
    Ingestion,
    Planner,
    TextAgents,
    Visual,
    Chart,
    Shorts,
    Review,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Queued => "QUEUED",
            Stage::Ingestion => "INGESTION",
            Stage::Planner => "PLANNER",
            Stage::TextAgents => "TEXT_AGENTS",
            Stage::Visual => "VISUAL",
            Stage::Chart => "CHART",
            Stage::Shorts => "SHORTS",
            Stage::Review => "REVIEW",
            Stage::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        match s {
            "QUEUED" => Some(Stage::Queued),
            "INGESTION" => Some(Stage::Ingestion),
            "PLANNER" => Some(Stage::Planner),
            "TEXT_AGENTS" => Some(Stage::TextAgents),
            "VISUAL" => Some(Stage::Visual),
            "CHART" => Some(Stage::Chart),
            "SHORTS" => Some(Stage::Shorts),
            "REVIEW" => Some(Stage::Review),
            "DONE" => Some(Stage::Done),
            _ => None,
        }
    }

    /// Progress checkpoint written when the stage is entered.
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Queued => 0,
            Stage::Ingestion => 5,
            Stage::Planner => 20,
            Stage::TextAgents => 40,
            Stage::Visual => 60,
            Stage::Chart => 72,
            Stage::Shorts => 82,
            Stage::Review => 92,
            Stage::Done => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// URL, or `markdown://` followed by the raw markdown body
    pub source_ref: String,
    pub targets: Vec<Target>,
    pub tone: String,
    pub language: String,
    pub mock_mode: bool,

    pub status: JobStatus,
    pub current_stage: Stage,
    pub progress: u8,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub cancel_requested: bool,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl Job {
    /// Create a new PENDING job.
    ///
    /// `id` and `created_at` are injected so callers can use deterministic
    /// providers in tests.
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        source_ref: impl Into<String>,
        targets: Vec<Target>,
        tone: impl Into<String>,
        language: impl Into<String>,
        mock_mode: bool,
    ) -> Self {
        Self {
            id: id.into(),
            source_ref: source_ref.into(),
            targets,
            tone: tone.into(),
            language: language.into(),
            mock_mode,
            status: JobStatus::Pending,
            current_stage: Stage::Queued,
            progress: 0,
            error_message: None,
            retry_count: 0,
            cancel_requested: false,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Check that a retry is allowed from the current state.
    pub fn ensure_retryable(&self) -> Result<()> {
        if !self.status.is_retryable() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Pending.to_string(),
            });
        }
        if self.retry_count >= MAX_RETRIES {
            return Err(DomainError::RetryLimitReached(MAX_RETRIES));
        }
        Ok(())
    }

    /// Reset run state for a retry. Callers persist the result atomically.
    pub fn reset_for_retry(&mut self) -> Result<()> {
        self.ensure_retryable()?;
        self.status = JobStatus::Pending;
        self.current_stage = Stage::Queued;
        self.progress = 0;
        self.error_message = None;
        self.cancel_requested = false;
        self.started_at = None;
        self.finished_at = None;
        self.retry_count += 1;
        Ok(())
    }
}

/// Join the first `MAX_ERROR_LINES` failures into one summary.
pub fn summarize_failures(failures: &[String]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    Some(
        failures
            .iter()
            .take(MAX_ERROR_LINES)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
