// Startup recovery of jobs left behind by a previous process

use crate::application::worker::constants::INTERRUPTED_MESSAGE;
use crate::application::worker::TaskQueue;
use crate::domain::{JobId, JobStatus, Stage};
use crate::port::{JobPatch, JobRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// RUNNING jobs marked FAILED
    pub interrupted: Vec<JobId>,
    /// PENDING jobs put back on the queue, in creation order
    pub requeued: Vec<JobId>,
}

/// Crash recovery service
///
/// A job that was RUNNING when the process died cannot be resumed mid-stage,
/// so it is failed (and stays retryable). PENDING jobs only lived in the
/// in-memory queue and are enqueued again.
pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(job_repo: Arc<dyn JobRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            job_repo,
            time_provider,
        }
    }

    /// Must run before the worker starts.
    pub async fn recover(&self, queue: &TaskQueue) -> crate::error::Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for job in self.job_repo.find_by_status(JobStatus::Running).await? {
            warn!(job_id = %job.id, stage = %job.current_stage, "Interrupted job marked FAILED");
            let patch = JobPatch::new()
                .status(JobStatus::Failed)
                .stage(Stage::Done)
                .error_message(Some(INTERRUPTED_MESSAGE.to_string()))
                .finished_at(self.time_provider.now_millis());
            if self.job_repo.update(&job.id, &patch).await? {
                report.interrupted.push(job.id);
            }
        }

        for job in self.job_repo.find_by_status(JobStatus::Pending).await? {
            queue.enqueue(job.id.clone());
            report.requeued.push(job.id);
        }

        info!(
            interrupted = report.interrupted.len(),
            requeued = report.requeued.len(),
            "Job recovery complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, Target};
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::time_provider::mocks::SteppingTimeProvider;

    async fn insert(repo: &InMemoryJobRepository, id: &str, created_at: i64, status: JobStatus) {
        let job = Job::new(id, created_at, "markdown://x", vec![Target::Blog], "t", "ko", true);
        repo.insert(&job).await.unwrap();
        repo.update(id, &JobPatch::new().status(status)).await.unwrap();
    }

    #[tokio::test]
    async fn test_running_failed_and_pending_requeued_in_order() {
        let repo = Arc::new(InMemoryJobRepository::new());
        insert(&repo, "running", 1, JobStatus::Running).await;
        insert(&repo, "pending-late", 30, JobStatus::Pending).await;
        insert(&repo, "pending-early", 20, JobStatus::Pending).await;
        insert(&repo, "done", 5, JobStatus::Succeeded).await;

        let service = RecoveryService::new(repo.clone(), Arc::new(SteppingTimeProvider::new(100, 1)));
        let queue = TaskQueue::default();
        let report = service.recover(&queue).await.unwrap();

        assert_eq!(report.interrupted, vec!["running"]);
        assert_eq!(report.requeued, vec!["pending-early", "pending-late"]);

        let job = repo.find_by_id("running").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));
        assert!(job.status.is_retryable());

        let done = repo.find_by_id("done").await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_store_recovers_nothing() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let service = RecoveryService::new(repo, Arc::new(SteppingTimeProvider::new(0, 1)));
        let report = service.recover(&TaskQueue::default()).await.unwrap();
        assert_eq!(report, RecoveryReport::default());
    }
}
