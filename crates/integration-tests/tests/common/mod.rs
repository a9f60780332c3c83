//! Shared harness: SQLite stores, real media adapters, unconfigured providers

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use contentforge_core::application::{
    CreateJobRequest, JobDefaults, JobService, Orchestrator, PipelineDeps, TaskQueue,
};
use contentforge_core::domain::{layout, Job};
use contentforge_core::port::{PromptStore, SystemTimeProvider, TimeProvider, UuidProvider};
use contentforge_infra_media::{
    default_chain, AnthropicConfig, AnthropicProvider, CommandRunner, FfmpegShortsGenerator,
    FileImageInspector, ImageApiClient, ImageApiConfig, ImageChartGenerator,
    ImageVisualGenerator, OpenAiConfig, OpenAiProvider, SourceIngestor, WebIngestor,
    WhisperClient, WhisperConfig, YoutubeIngestor,
};
use contentforge_infra_sqlite::{
    create_pool, run_migrations, SqliteJobRepository, SqlitePromptStore,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Harness {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub jobs: Arc<SqliteJobRepository>,
    pub prompts: Arc<SqlitePromptStore>,
    pub queue: Arc<TaskQueue>,
    pub orchestrator: Arc<Orchestrator>,
    pub service: JobService,
}

fn orchestrator(
    jobs: Arc<SqliteJobRepository>,
    prompts: Arc<SqlitePromptStore>,
    time: Arc<dyn TimeProvider>,
    output_root: PathBuf,
) -> Orchestrator {
    let text_providers = default_chain(
        OpenAiProvider::new(OpenAiConfig {
            api_key: String::new(),
            model: "gpt-4.1-mini".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: TIMEOUT,
        })
        .unwrap(),
        AnthropicProvider::new(AnthropicConfig {
            api_key: String::new(),
            model: "claude-3-5-sonnet-latest".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: TIMEOUT,
        })
        .unwrap(),
    );
    let image_api = Arc::new(
        ImageApiClient::new(ImageApiConfig {
            api_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout: TIMEOUT,
        })
        .unwrap(),
    );
    let whisper = Arc::new(
        WhisperClient::new(WhisperConfig {
            base_url: String::new(),
            model: "whisper-1".into(),
            api_key: String::new(),
            timeout: TIMEOUT,
        })
        .unwrap(),
    );
    let runner = CommandRunner::new(Duration::from_secs(60));

    Orchestrator::new(
        PipelineDeps {
            jobs,
            prompts,
            ingestor: Arc::new(SourceIngestor::new(
                WebIngestor::new(TIMEOUT).unwrap(),
                YoutubeIngestor::new(runner.clone(), Arc::clone(&whisper)),
            )),
            text_providers,
            visuals: Arc::new(ImageVisualGenerator::new(Arc::clone(&image_api), None)),
            charts: Arc::new(ImageChartGenerator::new(image_api, None)),
            shorts: Arc::new(FfmpegShortsGenerator::new(runner, whisper)),
            images: Arc::new(FileImageInspector),
            time,
        },
        output_root,
    )
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_database("sqlite::memory:", TempDir::new().unwrap()).await
    }

    pub async fn with_database(database_url: &str, dir: TempDir) -> Self {
        let pool = create_pool(database_url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let jobs = Arc::new(SqliteJobRepository::new(pool.clone()));
        let prompts = Arc::new(SqlitePromptStore::new(pool.clone(), Arc::clone(&time)));
        prompts.seed_defaults().await.unwrap();

        let output_root = dir.path().join("outputs");
        let queue = Arc::new(TaskQueue::new(Duration::from_millis(20)));
        let orchestrator = Arc::new(orchestrator(
            jobs.clone(),
            prompts.clone(),
            Arc::clone(&time),
            output_root.clone(),
        ));
        let service = JobService::new(
            jobs.clone(),
            Arc::clone(&queue),
            Arc::new(UuidProvider),
            time,
            output_root,
            JobDefaults {
                tone: "친근하고 실용적".to_string(),
                language: "ko".to_string(),
            },
        );

        Self {
            dir,
            pool,
            jobs,
            prompts,
            queue,
            orchestrator,
            service,
        }
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        layout::job_dir(&self.dir.path().join("outputs"), job_id)
    }

    /// Create a job and run it on the calling task, bypassing the queue.
    pub async fn run(&self, req: CreateJobRequest) -> Job {
        let job = self.service.create(req).await.unwrap();
        self.orchestrator.process_job(&job.id).await.unwrap();
        self.service.get(&job.id).await.unwrap()
    }

    /// Poll until the job reaches a terminal status.
    pub async fn wait_terminal(&self, job_id: &str) -> Job {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        loop {
            let job = self.service.get(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {} still {} at {}",
                job_id,
                job.status,
                job.current_stage
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

pub fn mock_request(markdown: &str, targets: &[&str]) -> CreateJobRequest {
    CreateJobRequest {
        source_markdown: Some(markdown.to_string()),
        targets: Some(targets.iter().map(|t| t.to_string()).collect()),
        mock_mode: true,
        ..Default::default()
    }
}
