// SQLite JobRepository Implementation

use crate::error::{is_unique_violation, map_sqlx_error};
use async_trait::async_trait;
use contentforge_core::domain::{Job, JobId, JobStatus, Stage, Target};
use contentforge_core::error::{AppError, Result};
use contentforge_core::port::{JobPatch, JobRepository};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::warn;

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> Result<()> {
        let targets: Vec<&str> = job.targets.iter().map(Target::as_str).collect();

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, source_ref, targets, tone, language, mock_mode,
                status, current_stage, progress, error_message,
                retry_count, cancel_requested,
                created_at, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.source_ref)
        .bind(serde_json::to_string(&targets)?)
        .bind(&job.tone)
        .bind(&job.language)
        .bind(job.mock_mode)
        .bind(job.status.as_str())
        .bind(job.current_stage.as_str())
        .bind(i64::from(job.progress))
        .bind(&job.error_message)
        .bind(i64::from(job.retry_count))
        .bind(job.cancel_requested)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Job already exists: {}", job.id))
            } else {
                map_sqlx_error(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE status = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn update(&self, id: &str, patch: &JobPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(self.find_by_id(id).await?.is_some());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE jobs SET ");
        let mut set = builder.separated(", ");
        if let Some(status) = patch.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(stage) = patch.current_stage {
            set.push("current_stage = ").push_bind_unseparated(stage.as_str());
        }
        if let Some(progress) = patch.progress {
            set.push("progress = ").push_bind_unseparated(i64::from(progress));
        }
        if let Some(message) = &patch.error_message {
            set.push("error_message = ").push_bind_unseparated(message.clone());
        }
        if let Some(at) = patch.started_at {
            set.push("started_at = ").push_bind_unseparated(at);
        }
        if let Some(at) = patch.finished_at {
            set.push("finished_at = ").push_bind_unseparated(at);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn request_cancel(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET cancel_requested = 1 WHERE id = ? AND status IN ('PENDING', 'RUNNING')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_for_retry(&self, id: &str, max_retries: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'PENDING', current_stage = 'QUEUED', progress = 0,
                error_message = NULL, cancel_requested = 0,
                started_at = NULL, finished_at = NULL,
                retry_count = retry_count + 1
            WHERE id = ?
              AND status IN ('FAILED', 'PARTIAL_SUCCESS')
              AND retry_count < ?
            "#,
        )
        .bind(id)
        .bind(i64::from(max_retries))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_created_before(&self, cutoff_millis: i64) -> Result<Vec<JobId>> {
        sqlx::query_scalar("SELECT id FROM jobs WHERE created_at < ? ORDER BY created_at ASC")
            .bind(cutoff_millis)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_beyond_newest(&self, keep: usize) -> Result<Vec<JobId>> {
        // LIMIT -1 means "no limit" in SQLite
        sqlx::query_scalar(
            "SELECT id FROM jobs ORDER BY created_at DESC, id DESC LIMIT -1 OFFSET ?",
        )
        .bind(keep as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}

// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    source_ref: String,
    targets: String,
    tone: String,
    language: String,
    mock_mode: bool,
    status: String,
    current_stage: String,
    progress: i64,
    error_message: Option<String>,
    retry_count: i64,
    cancel_requested: bool,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let status = JobStatus::parse(&self.status).ok_or_else(|| {
            AppError::Database(format!("Unknown job status '{}' for {}", self.status, self.id))
        })?;
        let current_stage = Stage::parse(&self.current_stage).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown stage '{}' for {}",
                self.current_stage, self.id
            ))
        })?;

        let names: Vec<String> = serde_json::from_str(&self.targets)?;
        let targets = names
            .iter()
            .filter_map(|name| {
                let target = Target::from_name(name);
                if target.is_none() {
                    warn!(job_id = %self.id, target = %name, "Ignoring unknown stored target");
                }
                target
            })
            .collect();

        Ok(Job {
            id: self.id,
            source_ref: self.source_ref,
            targets,
            tone: self.tone,
            language: self.language,
            mock_mode: self.mock_mode,
            status,
            current_stage,
            progress: self.progress.clamp(0, 100) as u8,
            error_message: self.error_message,
            retry_count: self.retry_count.max(0) as u32,
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}
