// Cancel / Retry Use Cases

use crate::domain::{DomainError, Job, JobStatus, MAX_RETRIES};
use crate::error::{AppError, Result};
use crate::port::JobRepository;
use tracing::info;

/// Request cancellation.
///
/// Terminal jobs are left alone and their status is returned unchanged.
/// Otherwise the flag is set and `CANCELED` is reported; the worker applies
/// it at its next stage boundary (or when the job is dequeued).
pub async fn cancel(job_repo: &dyn JobRepository, job_id: &str) -> Result<JobStatus> {
    let job = find(job_repo, job_id).await?;
    if job.status.is_terminal() {
        return Ok(job.status);
    }

    if job_repo.request_cancel(job_id).await? {
        info!(job_id = %job_id, "Cancel requested");
        return Ok(JobStatus::Canceled);
    }

    // Finished between the read and the conditional write
    Ok(find(job_repo, job_id).await?.status)
}

/// Reset a FAILED or PARTIAL_SUCCESS job for one more run.
///
/// Returns the reset job; the caller re-enqueues it.
pub async fn retry(job_repo: &dyn JobRepository, job_id: &str) -> Result<Job> {
    let job = find(job_repo, job_id).await?;
    job.ensure_retryable().map_err(|e| match e {
        DomainError::RetryLimitReached(_) => AppError::Conflict("retry limit reached".into()),
        _ => AppError::Conflict("only failed or partial jobs can be retried".into()),
    })?;

    if !job_repo.reset_for_retry(job_id, MAX_RETRIES).await? {
        return Err(AppError::Conflict(format!(
            "job {} changed while retrying",
            job_id
        )));
    }
    info!(job_id = %job_id, retry_count = job.retry_count + 1, "Job reset for retry");
    find(job_repo, job_id).await
}

pub(crate) async fn find(job_repo: &dyn JobRepository, job_id: &str) -> Result<Job> {
    job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job not found: {}", job_id)))
}
