// Retention Service
// Prunes old jobs together with their output directories

use crate::application::worker::constants::RETENTION_INTERVAL;
use crate::application::worker::ShutdownToken;
use crate::domain::{layout, JobId};
use crate::error::Result;
use crate::port::{JobRepository, TimeProvider};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Jobs created more than this many days ago are deleted
    pub retention_days: u32,
    /// At most this many (newest) jobs are kept
    pub max_jobs: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            max_jobs: 200,
        }
    }
}

pub struct RetentionService {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
    output_root: PathBuf,
    config: RetentionConfig,
}

impl RetentionService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        output_root: impl Into<PathBuf>,
        config: RetentionConfig,
    ) -> Self {
        Self {
            job_repo,
            time_provider,
            output_root: output_root.into(),
            config,
        }
    }

    /// Delete expired jobs, then everything beyond the newest `max_jobs`.
    ///
    /// Returns the deleted job ids. A directory that cannot be removed is
    /// logged and does not stop the sweep.
    pub async fn prune(&self) -> Result<Vec<JobId>> {
        let cutoff =
            self.time_provider.now_millis() - i64::from(self.config.retention_days) * MILLIS_PER_DAY;

        let mut doomed: BTreeSet<JobId> = self
            .job_repo
            .find_created_before(cutoff)
            .await?
            .into_iter()
            .collect();
        doomed.extend(self.job_repo.find_beyond_newest(self.config.max_jobs).await?);

        let mut deleted = Vec::with_capacity(doomed.len());
        for job_id in doomed {
            if !self.job_repo.delete(&job_id).await? {
                continue;
            }
            let dir = layout::job_dir(&self.output_root, &job_id);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(job_id = %job_id, dir = %dir.display(), error = %e, "Failed to remove job directory"),
            }
            deleted.push(job_id);
        }

        info!(
            deleted = deleted.len(),
            retention_days = self.config.retention_days,
            max_jobs = self.config.max_jobs,
            "Retention sweep completed"
        );
        Ok(deleted)
    }
}

/// Runs the retention sweep every `RETENTION_INTERVAL` until shutdown.
pub struct RetentionScheduler {
    service: Arc<RetentionService>,
}

impl RetentionScheduler {
    pub fn new(service: Arc<RetentionService>) -> Self {
        Self { service }
    }

    /// Background loop; spawn with `tokio::spawn`. The first sweep runs one
    /// interval after start, so call `RetentionService::prune` for the
    /// startup sweep.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_hours = RETENTION_INTERVAL.as_secs() / 3600,
            "Retention scheduler started"
        );
        let mut tick = interval_at(Instant::now() + RETENTION_INTERVAL, RETENTION_INTERVAL);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.service.prune().await {
                        error!(error = %e, "Scheduled retention sweep failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Retention scheduler stopped");
                    break;
                }
            }
        }
    }
}
