//! Unit tests for the job service

use super::*;
use crate::domain::{ArtifactKind, Stage, Target};
use crate::error::AppError;
use crate::port::id_provider::mocks::SequentialIdProvider;
use crate::port::job_repository::mocks::InMemoryJobRepository;
use crate::port::time_provider::mocks::SteppingTimeProvider;
use crate::port::JobPatch;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    repo: Arc<InMemoryJobRepository>,
    service: JobService,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(InMemoryJobRepository::new());
    let service = JobService::new(
        repo.clone(),
        Arc::new(TaskQueue::new(Duration::from_millis(20))),
        Arc::new(SequentialIdProvider::new()),
        Arc::new(SteppingTimeProvider::new(1_000, 10)),
        dir.path(),
        JobDefaults {
            tone: "친근하고 실용적".to_string(),
            language: "ko".to_string(),
        },
    );
    Fixture { dir, repo, service }
}

fn markdown_request(targets: Option<Vec<&str>>) -> CreateJobRequest {
    CreateJobRequest {
        source_markdown: Some("  # T\n\nBody.  ".to_string()),
        targets: targets.map(|t| t.into_iter().map(String::from).collect()),
        mock_mode: true,
        ..Default::default()
    }
}

async fn finish(repo: &InMemoryJobRepository, id: &str, status: JobStatus) {
    let patch = JobPatch::new().status(status).stage(Stage::Done);
    assert!(repo.update(id, &patch).await.unwrap());
}

#[test]
fn test_markdown_takes_precedence_and_is_trimmed() {
    let mut req = markdown_request(None);
    req.source_url = Some("https://example.com".to_string());
    let validated = validate_request(&req).unwrap();
    assert_eq!(validated.source_ref, "markdown://# T\n\nBody.");
    assert_eq!(validated.targets.len(), 9);
    assert!(!validated.targets.contains(&Target::ShortsVideos));
}

#[test]
fn test_source_is_required() {
    let err = validate_request(&CreateJobRequest::default()).unwrap_err();
    assert!(err.to_string().contains("source_markdown or source_url is required"));

    let req = CreateJobRequest {
        source_markdown: Some("   ".to_string()),
        source_url: Some("ftp://example.com".to_string()),
        ..Default::default()
    };
    let err = validate_request(&req).unwrap_err();
    assert!(err.to_string().contains("must start with http:// or https://"));
}

#[test]
fn test_aliases_expand_without_duplicates() {
    let req = markdown_request(Some(vec!["blog", "visuals", "charts", "Blog", "thumbnail"]));
    let validated = validate_request(&req).unwrap();
    assert_eq!(
        validated.targets,
        vec![Target::Blog, Target::CardNews, Target::Thumbnail, Target::Chart]
    );
}

#[test]
fn test_bad_targets_are_validation_errors() {
    let err = validate_request(&markdown_request(Some(vec!["blog", "podcast"]))).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.to_string().contains("podcast"));

    let err = validate_request(&markdown_request(Some(vec![" "]))).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_create_persists_pending_job_with_defaults() {
    let f = fixture();
    let job = f.service.create(markdown_request(Some(vec!["blog"]))).await.unwrap();

    assert_eq!(job.id, "job-1");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.current_stage, Stage::Queued);
    assert_eq!(job.progress, 0);
    assert_eq!(job.tone, "친근하고 실용적");
    assert_eq!(job.language, "ko");
    assert!(job.mock_mode);
    assert_eq!(f.service.get("job-1").await.unwrap().targets, vec![Target::Blog]);
}

#[tokio::test]
async fn test_cancel_pending_then_terminal_is_noop() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();
    assert_eq!(f.service.cancel("job-1").await.unwrap(), JobStatus::Canceled);
    assert!(f.service.get("job-1").await.unwrap().cancel_requested);

    f.service.create(markdown_request(None)).await.unwrap();
    finish(&f.repo, "job-2", JobStatus::Succeeded).await;
    assert_eq!(f.service.cancel("job-2").await.unwrap(), JobStatus::Succeeded);
    assert!(!f.service.get("job-2").await.unwrap().cancel_requested);
}

#[tokio::test]
async fn test_cancel_unknown_job_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.service.cancel("nope").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_retry_only_once_and_only_from_failed_or_partial() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();

    let err = f.service.retry("job-1").await.unwrap_err();
    assert!(err.to_string().contains("only failed or partial jobs can be retried"));

    finish(&f.repo, "job-1", JobStatus::PartialSuccess).await;
    let job = f.service.retry("job-1").await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.current_stage, Stage::Queued);
    assert_eq!(job.progress, 0);
    assert!(job.error_message.is_none());
    assert_eq!(job.retry_count, 1);

    finish(&f.repo, "job-1", JobStatus::Failed).await;
    let err = f.service.retry("job-1").await.unwrap_err();
    assert!(err.to_string().contains("retry limit reached"));
}

#[tokio::test]
async fn test_retry_from_succeeded_is_rejected() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();
    finish(&f.repo, "job-1", JobStatus::Succeeded).await;
    assert!(matches!(
        f.service.retry("job-1").await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_artifacts_are_listed_sorted_with_kinds() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();
    let root = f.dir.path().join("job-1");
    std::fs::create_dir_all(root.join("visuals/card-news")).unwrap();
    std::fs::write(root.join("brief.md"), "# brief").unwrap();
    std::fs::write(root.join("visuals/card-news/slide-01.png"), [0u8; 4]).unwrap();
    std::fs::write(root.join("notes.srt"), "1").unwrap();

    let artifacts = f.service.artifacts("job-1").await.unwrap();
    let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(paths, vec!["brief.md", "notes.srt", "visuals/card-news/slide-01.png"]);
    assert_eq!(artifacts[0].kind, ArtifactKind::Markdown);
    assert_eq!(artifacts[0].size, 7);
    assert_eq!(artifacts[1].kind, ArtifactKind::File);
    assert_eq!(artifacts[2].kind, ArtifactKind::Image);
}

#[tokio::test]
async fn test_artifacts_of_job_without_output_is_empty() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();
    assert!(f.service.artifacts("job-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_artifact_path_guards() {
    let f = fixture();
    f.service.create(markdown_request(None)).await.unwrap();
    let root = f.dir.path().join("job-1");
    std::fs::create_dir_all(root.join("threads")).unwrap();
    std::fs::write(root.join("blog.md"), "x").unwrap();
    std::fs::write(root.join("notes.srt"), "x").unwrap();
    std::fs::write(f.dir.path().join("secret.md"), "x").unwrap();

    let path = f.service.artifact_path("job-1", "blog.md").await.unwrap();
    assert!(path.ends_with("blog.md"));

    let err = f.service.artifact_path("job-1", "../secret.md").await.unwrap_err();
    assert!(err.to_string().contains("invalid artifact path"));
    let err = f.service.artifact_path("job-1", "/etc/passwd").await.unwrap_err();
    assert!(err.to_string().contains("invalid artifact path"));
    let err = f.service.artifact_path("job-1", "notes.srt").await.unwrap_err();
    assert!(err.to_string().contains("unsupported artifact extension"));
    let err = f.service.artifact_path("job-1", "threads").await.unwrap_err();
    assert!(err.to_string().contains("artifact not found"));
    let err = f.service.artifact_path("job-1", "missing.md").await.unwrap_err();
    assert!(err.to_string().contains("artifact not found"));
}
