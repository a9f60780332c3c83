//! ContentForge Daemon - Main Entry Point
//! Composition root: settings, logging, storage, pipeline, queue, RPC

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use contentforge_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use contentforge_core::application::{
    shutdown_channel, JobDefaults, JobService, Orchestrator, PipelineDeps, RecoveryService,
    RetentionConfig, RetentionScheduler, RetentionService, TaskQueue,
};
use contentforge_core::port::{PromptStore, SystemTimeProvider, TimeProvider, UuidProvider};
use contentforge_infra_media::{
    default_chain, load_font, AnthropicConfig, AnthropicProvider, CommandRunner,
    FfmpegShortsGenerator, FileImageInspector, ImageApiClient, ImageApiConfig,
    ImageChartGenerator, ImageVisualGenerator, OpenAiConfig, OpenAiProvider, SourceIngestor,
    WebIngestor, WhisperClient, WhisperConfig, YoutubeIngestor,
};
use contentforge_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository, SqlitePromptStore};

use crate::config::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Settings first: they pick the log format
    let settings = Arc::new(Settings::load()?);
    let _telemetry = telemetry::init(&settings).context("Failed to initialize logging")?;

    info!("ContentForge daemon v{} starting...", VERSION);

    // 2. Storage
    if let Some(dir) = settings.database_dir() {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let output_root = settings.output_root();
    tokio::fs::create_dir_all(&output_root)
        .await
        .with_context(|| format!("Failed to create {}", output_root.display()))?;

    let database_url = settings.database_url();
    info!(database_url = %database_url, output_root = %output_root.display(), "Opening database");
    let pool = create_pool(&database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let jobs = Arc::new(SqliteJobRepository::new(pool.clone()));
    let prompts = Arc::new(SqlitePromptStore::new(pool.clone(), Arc::clone(&time)));
    prompts
        .seed_defaults()
        .await
        .context("Prompt seeding failed")?;

    // 3. Retention sweep before recovery so pruned jobs are not requeued
    let retention = Arc::new(RetentionService::new(
        jobs.clone(),
        Arc::clone(&time),
        output_root.clone(),
        RetentionConfig {
            retention_days: settings.retention_days,
            max_jobs: settings.max_jobs,
        },
    ));
    match retention.prune().await {
        Ok(deleted) => info!(deleted = deleted.len(), "Startup retention sweep completed"),
        Err(e) => error!(error = %e, "Startup retention sweep failed"),
    }

    let queue = Arc::new(TaskQueue::new(settings.worker_poll_interval()));
    RecoveryService::new(jobs.clone(), Arc::clone(&time))
        .recover(&queue)
        .await
        .context("Crash recovery failed")?;

    // 4. External providers and generators
    let request_timeout = settings.request_timeout();
    let text_providers = default_chain(
        OpenAiProvider::new(OpenAiConfig {
            api_key: settings.openai_api_key.clone(),
            model: settings.openai_model.clone(),
            base_url: settings.openai_base_url.clone(),
            timeout: request_timeout,
        })?,
        AnthropicProvider::new(AnthropicConfig {
            api_key: settings.anthropic_api_key.clone(),
            model: settings.anthropic_model.clone(),
            base_url: settings.anthropic_base_url.clone(),
            timeout: request_timeout,
        })?,
    );
    if !text_providers.iter().any(|p| p.is_available()) {
        warn!("No text provider configured; planner falls back to heuristics and text targets fail");
    }

    let image_api = Arc::new(ImageApiClient::new(ImageApiConfig {
        api_url: settings.nanobanana_api_url.clone(),
        api_key: settings.nanobanana_api_key.clone(),
        model: settings.nanobanana_model.clone(),
        timeout: request_timeout,
    })?);
    let whisper = Arc::new(WhisperClient::new(WhisperConfig {
        base_url: settings.whisper_base_url.clone(),
        model: settings.whisper_model.clone(),
        api_key: settings.openai_api_key.clone(),
        timeout: request_timeout,
    })?);
    let font = settings.font_path().and_then(|path| load_font(&path));
    let runner = CommandRunner::new(settings.command_timeout());

    let ingestor = SourceIngestor::new(
        WebIngestor::new(request_timeout)?,
        YoutubeIngestor::new(runner.clone(), Arc::clone(&whisper)),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        PipelineDeps {
            jobs: jobs.clone(),
            prompts: prompts.clone(),
            ingestor: Arc::new(ingestor),
            text_providers,
            visuals: Arc::new(ImageVisualGenerator::new(Arc::clone(&image_api), font.clone())),
            charts: Arc::new(ImageChartGenerator::new(image_api, font)),
            shorts: Arc::new(FfmpegShortsGenerator::new(runner, whisper)),
            images: Arc::new(FileImageInspector),
            time: Arc::clone(&time),
        },
        output_root.clone(),
    ));

    // 5. Worker
    queue.start(orchestrator);
    info!("Task queue worker started");

    // 6. JSON-RPC server
    let job_service = Arc::new(JobService::new(
        jobs,
        Arc::clone(&queue),
        Arc::new(UuidProvider),
        Arc::clone(&time),
        output_root,
        JobDefaults {
            tone: settings.default_tone.clone(),
            language: settings.default_language.clone(),
        },
    ));
    let rpc_config = RpcServerConfig {
        host: settings.rpc_host.clone(),
        port: settings.rpc_port,
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, RpcHandler::new(job_service, prompts))
        .start()
        .await
        .context("RPC server start failed")?;

    // 7. Retention every 24h
    let (shutdown_tx, shutdown_token) = shutdown_channel();
    let retention_handle = tokio::spawn(RetentionScheduler::new(retention).run(shutdown_token));

    info!(rpc_addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown; the in-flight job is never aborted
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    rpc_handle.stopped().await;
    shutdown_tx.shutdown();
    queue.stop().await;
    if let Err(e) = retention_handle.await {
        warn!(error = %e, "Retention scheduler task failed");
    }

    info!("Shutdown complete.");
    Ok(())
}
