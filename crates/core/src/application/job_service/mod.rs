// Job Service - API-facing use cases for content jobs

pub mod artifacts;
pub mod control;
pub mod create;

#[cfg(test)]
mod service_test;

pub use create::{validate_request, CreateJobRequest, JobDefaults, ValidatedRequest};

use crate::application::worker::TaskQueue;
use crate::domain::{layout, Artifact, Job, JobStatus};
use crate::error::Result;
use crate::port::{IdProvider, JobRepository, TimeProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct JobService {
    job_repo: Arc<dyn JobRepository>,
    queue: Arc<TaskQueue>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    output_root: PathBuf,
    defaults: JobDefaults,
}

impl JobService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        queue: Arc<TaskQueue>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        output_root: impl Into<PathBuf>,
        defaults: JobDefaults,
    ) -> Self {
        Self {
            job_repo,
            queue,
            id_provider,
            time_provider,
            output_root: output_root.into(),
            defaults,
        }
    }

    /// Validate, persist as PENDING and enqueue.
    pub async fn create(&self, req: CreateJobRequest) -> Result<Job> {
        let job = create::execute(
            self.job_repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            &self.defaults,
            req,
        )
        .await?;
        self.queue.enqueue(job.id.clone());
        info!(job_id = %job.id, targets = job.targets.len(), mock = job.mock_mode, "Job created");
        Ok(job)
    }

    pub async fn get(&self, job_id: &str) -> Result<Job> {
        control::find(self.job_repo.as_ref(), job_id).await
    }

    /// Newest first
    pub async fn list(&self, limit: usize) -> Result<Vec<Job>> {
        self.job_repo.list_recent(limit).await
    }

    pub async fn cancel(&self, job_id: &str) -> Result<JobStatus> {
        control::cancel(self.job_repo.as_ref(), job_id).await
    }

    /// Reset and re-enqueue. Produces a second, independent run.
    pub async fn retry(&self, job_id: &str) -> Result<Job> {
        let job = control::retry(self.job_repo.as_ref(), job_id).await?;
        self.queue.enqueue(job.id.clone());
        Ok(job)
    }

    pub async fn artifacts(&self, job_id: &str) -> Result<Vec<Artifact>> {
        let job = self.get(job_id).await?;
        artifacts::list(&layout::job_dir(&self.output_root, &job.id)).await
    }

    /// Absolute path of a downloadable artifact
    pub async fn artifact_path(&self, job_id: &str, rel: &str) -> Result<PathBuf> {
        let job = self.get(job_id).await?;
        artifacts::resolve(&layout::job_dir(&self.output_root, &job.id), rel).await
    }
}
