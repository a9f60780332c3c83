// Job Repository Port (Interface)

use crate::domain::{Job, JobId, JobStatus, Stage};
use crate::error::Result;
use async_trait::async_trait;

/// Field-level update of a job's run state.
///
/// `None` leaves a column untouched. The cancel flag is never part of a
/// patch so a concurrent cancel request cannot be overwritten by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub current_stage: Option<Stage>,
    pub progress: Option<u8>,
    pub error_message: Option<Option<String>>,
    pub started_at: Option<Option<i64>>,
    pub finished_at: Option<Option<i64>>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the stage together with its progress checkpoint.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.current_stage = Some(stage);
        self.progress = Some(stage.progress());
        self
    }

    pub fn error_message(mut self, message: Option<String>) -> Self {
        self.error_message = Some(message);
        self
    }

    pub fn started_at(mut self, at: i64) -> Self {
        self.started_at = Some(Some(at));
        self
    }

    pub fn finished_at(mut self, at: i64) -> Self {
        self.finished_at = Some(Some(at));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == JobPatch::default()
    }

    /// Apply the patch to an in-memory copy.
    pub fn apply(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(stage) = self.current_stage {
            job.current_stage = stage;
        }
        if let Some(progress) = self.progress {
            job.progress = progress;
        }
        if let Some(message) = &self.error_message {
            job.error_message = message.clone();
        }
        if let Some(at) = self.started_at {
            job.started_at = at;
        }
        if let Some(at) = self.finished_at {
            job.finished_at = at;
        }
    }
}

/// Repository interface for Job persistence
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Job>>;

    /// Newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>>;

    /// Oldest first (for recovery)
    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<Job>>;

    /// Apply a field-level update. Returns false if the job does not exist.
    async fn update(&self, id: &str, patch: &JobPatch) -> Result<bool>;

    /// Set `cancel_requested` if the job is still PENDING or RUNNING.
    ///
    /// Returns true when the flag was set by this call or was already set.
    async fn request_cancel(&self, id: &str) -> Result<bool>;

    /// Atomically reset run state for a retry.
    ///
    /// Only applies when status is FAILED or PARTIAL_SUCCESS and
    /// `retry_count < max_retries`; returns false otherwise.
    async fn reset_for_retry(&self, id: &str, max_retries: u32) -> Result<bool>;

    /// Delete job row. Returns true if a row was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// IDs of jobs created before `cutoff_millis`
    async fn find_created_before(&self, cutoff_millis: i64) -> Result<Vec<JobId>>;

    /// IDs of all jobs except the newest `keep`
    async fn find_beyond_newest(&self, keep: usize) -> Result<Vec<JobId>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory job store with the same conditional semantics as SQLite
    #[derive(Default)]
    pub struct InMemoryJobRepository {
        jobs: Mutex<HashMap<String, Job>>,
        history: Mutex<Vec<(String, JobPatch)>>,
    }

    impl InMemoryJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every patch applied so far, in order
        pub fn history(&self) -> Vec<(String, JobPatch)> {
            self.history.lock().unwrap().clone()
        }

        pub fn len(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn sorted_newest_first(&self) -> Vec<Job> {
            let mut jobs: Vec<Job> = self.jobs.lock().unwrap().values().cloned().collect();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            jobs
        }
    }

    #[async_trait]
    impl JobRepository for InMemoryJobRepository {
        async fn insert(&self, job: &Job) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(crate::error::AppError::Conflict(format!(
                    "Job already exists: {}",
                    job.id
                )));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn list_recent(&self, limit: usize) -> Result<Vec<Job>> {
            Ok(self.sorted_newest_first().into_iter().take(limit).collect())
        }

        async fn find_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
            let mut jobs = self.sorted_newest_first();
            jobs.reverse();
            Ok(jobs.into_iter().filter(|j| j.status == status).collect())
        }

        async fn update(&self, id: &str, patch: &JobPatch) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(id) {
                Some(job) => {
                    patch.apply(job);
                    self.history
                        .lock()
                        .unwrap()
                        .push((id.to_string(), patch.clone()));
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn request_cancel(&self, id: &str) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(id) {
                Some(job) if !job.status.is_terminal() => {
                    job.cancel_requested = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn reset_for_retry(&self, id: &str, max_retries: u32) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(id) {
                Some(job) if job.status.is_retryable() && job.retry_count < max_retries => {
                    Ok(job.reset_for_retry().is_ok())
                }
                _ => Ok(false),
            }
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            Ok(self.jobs.lock().unwrap().remove(id).is_some())
        }

        async fn find_created_before(&self, cutoff_millis: i64) -> Result<Vec<JobId>> {
            Ok(self
                .sorted_newest_first()
                .into_iter()
                .filter(|j| j.created_at < cutoff_millis)
                .map(|j| j.id)
                .collect())
        }

        async fn find_beyond_newest(&self, keep: usize) -> Result<Vec<JobId>> {
            Ok(self
                .sorted_newest_first()
                .into_iter()
                .skip(keep)
                .map(|j| j.id)
                .collect())
        }
    }
}
