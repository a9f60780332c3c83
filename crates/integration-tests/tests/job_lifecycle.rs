//! Job lifecycle through the queue worker: cancel, retry, artifacts, recovery

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{mock_request, Harness};
use contentforge_core::application::{JobProcessor, RecoveryService, TaskQueue};
use contentforge_core::domain::{layout, ArtifactKind, JobStatus, Stage};
use contentforge_core::error::AppError;
use contentforge_core::port::{JobPatch, JobRepository, SystemTimeProvider};
use contentforge_infra_sqlite::{create_pool, SqliteJobRepository};
use tempfile::TempDir;

const SOURCE: &str = "# 주간 리포트\n\n신규 가입자가 12% 증가했습니다.\n\n이탈률은 3주 연속 감소했습니다.";

fn start_worker(h: &Harness) {
    let processor: Arc<dyn JobProcessor> = h.orchestrator.clone();
    assert!(h.queue.start(processor));
}

#[tokio::test]
async fn test_queued_job_runs_to_completion() {
    let h = Harness::new().await;
    start_worker(&h);

    let created = h.service.create(mock_request(SOURCE, &["blog", "linkedin"])).await.unwrap();
    assert_eq!(created.status, JobStatus::Pending);
    assert_eq!(created.current_stage, Stage::Queued);

    let job = h.wait_terminal(&created.id).await;
    assert_eq!(job.status, JobStatus::Succeeded);

    let listed = h.service.list(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    h.queue.stop().await;
}

#[tokio::test]
async fn test_cancel_before_start() {
    let h = Harness::new().await;
    let created = h.service.create(mock_request(SOURCE, &["blog"])).await.unwrap();

    let status = h.service.cancel(&created.id).await.unwrap();
    assert_eq!(status, JobStatus::Canceled);

    start_worker(&h);
    let job = h.wait_terminal(&created.id).await;
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.error_message.is_none());
    assert!(!h.job_dir(&job.id).join(layout::BRIEF).exists());

    // Terminal jobs keep their status
    assert_eq!(h.service.cancel(&job.id).await.unwrap(), JobStatus::Canceled);

    h.queue.stop().await;
}

#[tokio::test]
async fn test_retry_rules() {
    let h = Harness::new().await;
    start_worker(&h);

    let created = h.service.create(mock_request(SOURCE, &["blog"])).await.unwrap();
    let job = h.wait_terminal(&created.id).await;
    assert_eq!(job.status, JobStatus::Succeeded);

    let err = h.service.retry(&job.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);

    // Failed jobs can be retried and run again
    let failed = JobPatch::new()
        .status(JobStatus::Failed)
        .stage(Stage::Done)
        .error_message(Some("PLANNER 실패: boom".to_string()));
    assert!(h.jobs.update(&job.id, &failed).await.unwrap());

    let reset = h.service.retry(&job.id).await.unwrap();
    assert_eq!(reset.status, JobStatus::Pending);
    assert_eq!(reset.retry_count, 1);
    assert!(reset.error_message.is_none());

    let rerun = h.wait_terminal(&job.id).await;
    assert_eq!(rerun.status, JobStatus::Succeeded);
    assert_eq!(rerun.retry_count, 1);

    h.queue.stop().await;
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let h = Harness::new().await;
    assert!(matches!(
        h.service.get("missing").await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        h.service.cancel("missing").await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_artifacts_listing_and_download_paths() {
    let h = Harness::new().await;
    let job = h.run(mock_request(SOURCE, &["blog", "thumbnail"])).await;
    assert_eq!(job.status, JobStatus::Succeeded);

    let artifacts = h.service.artifacts(&job.id).await.unwrap();
    let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    assert!(paths.contains(&layout::BLOG));
    assert!(paths.contains(&layout::BRIEF));
    assert!(paths.contains(&layout::THUMBNAIL));

    let thumb = artifacts.iter().find(|a| a.path == layout::THUMBNAIL).unwrap();
    assert_eq!(thumb.kind, ArtifactKind::Image);
    assert!(thumb.size > 0);

    let path = h.service.artifact_path(&job.id, layout::BLOG).await.unwrap();
    assert!(path.ends_with(layout::BLOG));

    for bad in ["../secret.md", "/etc/passwd", ""] {
        assert!(
            matches!(
                h.service.artifact_path(&job.id, bad).await.unwrap_err(),
                AppError::Validation(_)
            ),
            "{:?} accepted",
            bad
        );
    }
    assert!(matches!(
        h.service.artifact_path(&job.id, "nope.md").await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_recovery_after_restart() {
    let dir = TempDir::new().unwrap();
    let database_url = format!("sqlite://{}", dir.path().join("jobs.db").display());
    let h = Harness::with_database(&database_url, dir).await;

    let interrupted = h.service.create(mock_request(SOURCE, &["blog"])).await.unwrap();
    let pending = h.service.create(mock_request(SOURCE, &["blog"])).await.unwrap();
    let running = JobPatch::new()
        .status(JobStatus::Running)
        .stage(Stage::TextAgents);
    assert!(h.jobs.update(&interrupted.id, &running).await.unwrap());

    // Second process on the same database file
    let pool = create_pool(&database_url).await.unwrap();
    let repo = Arc::new(SqliteJobRepository::new(pool));
    let queue = TaskQueue::new(Duration::from_millis(20));
    let report = RecoveryService::new(repo.clone(), Arc::new(SystemTimeProvider))
        .recover(&queue)
        .await
        .unwrap();
    assert_eq!(report.interrupted, vec![interrupted.id.clone()]);
    assert_eq!(report.requeued, vec![pending.id.clone()]);

    let failed = repo.find_by_id(&interrupted.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.is_some());
    assert!(failed.status.is_retryable());

    let processor: Arc<dyn JobProcessor> = h.orchestrator.clone();
    assert!(queue.start(processor));
    let job = h.wait_terminal(&pending.id).await;
    assert_eq!(job.status, JobStatus::Succeeded);
    queue.stop().await;
}
