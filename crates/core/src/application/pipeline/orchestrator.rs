// Orchestrator - drives one job from INGESTION to DONE
//
// The job record is the only shared state. Every stage boundary re-reads the
// cancel flag from the repository because cancel requests arrive from the
// API while the worker is mid-run.

use super::brief::{build_brief, BriefInput};
use super::key_messages::extract_key_messages;
use super::reviewer::Reviewer;
use super::text_agents::{TextAgentInput, TextAgentService};
use crate::application::worker::constants::{KEY_MESSAGE_COUNT, SHORTS_CLIP_COUNT};
use crate::application::worker::JobProcessor;
use crate::domain::job::summarize_failures;
use crate::domain::{layout, IngestionResult, Job, JobStatus, PromptMap, Stage, Target, VariableMap};
use crate::error::Result;
use crate::port::{
    ChartGenerator, ImageInspector, Ingestor, JobPatch, JobRepository, PromptStore,
    ShortsGenerator, ShortsRequest, TextProvider, TimeProvider, VisualGenerator,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const SHORTS_SKIPPED_WARNING: &str =
    "입력 소스에 원본 영상이 없어 shorts-videos 생성을 건너뛰었습니다.";

/// Collaborators of the stage runner
pub struct PipelineDeps {
    pub jobs: Arc<dyn JobRepository>,
    pub prompts: Arc<dyn PromptStore>,
    pub ingestor: Arc<dyn Ingestor>,
    /// Tried in order by the planner and the text agents
    pub text_providers: Vec<Arc<dyn TextProvider>>,
    pub visuals: Arc<dyn VisualGenerator>,
    pub charts: Arc<dyn ChartGenerator>,
    pub shorts: Arc<dyn ShortsGenerator>,
    pub images: Arc<dyn ImageInspector>,
    pub time: Arc<dyn TimeProvider>,
}

pub struct Orchestrator {
    jobs: Arc<dyn JobRepository>,
    prompts: Arc<dyn PromptStore>,
    ingestor: Arc<dyn Ingestor>,
    text_agents: TextAgentService,
    visuals: Arc<dyn VisualGenerator>,
    charts: Arc<dyn ChartGenerator>,
    shorts: Arc<dyn ShortsGenerator>,
    reviewer: Reviewer,
    time: Arc<dyn TimeProvider>,
    output_root: PathBuf,
}

/// Why a run stopped before REVIEW
enum Halt {
    Canceled,
    Vanished,
    Failed,
}

/// State accumulated across the stages of one run
struct RunState {
    job: Job,
    output_dir: PathBuf,
    targets: Vec<Target>,
    /// Text targets whose failure is already in `failures`
    failed_targets: Vec<Target>,
    failures: Vec<String>,
    warnings: Vec<String>,
}

impl RunState {
    fn wants(&self, target: Target) -> bool {
        self.targets.contains(&target)
    }
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps, output_root: impl Into<PathBuf>) -> Self {
        let reviewer = Reviewer::new(deps.images, Arc::clone(&deps.shorts));
        Self {
            jobs: deps.jobs,
            prompts: deps.prompts,
            ingestor: deps.ingestor,
            text_agents: TextAgentService::new(deps.text_providers),
            visuals: deps.visuals,
            charts: deps.charts,
            shorts: deps.shorts,
            reviewer,
            time: deps.time,
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run every stage of `job_id`.
    ///
    /// Stage failures are persisted on the job, never returned. An `Err`
    /// means the job store itself failed.
    #[instrument(skip(self))]
    pub async fn process_job(&self, job_id: &str) -> Result<()> {
        let started = JobPatch::new()
            .status(JobStatus::Running)
            .stage(Stage::Ingestion)
            .started_at(self.time.now_millis())
            .error_message(None);
        if !self.jobs.update(job_id, &started).await? {
            info!("Job no longer exists, skipping");
            return Ok(());
        }

        let output_dir = layout::job_dir(&self.output_root, job_id);
        let workdir = output_dir.join(layout::WORK_DIR);
        tokio::fs::create_dir_all(&workdir).await?;

        let Some(job) = self.jobs.find_by_id(job_id).await? else {
            return Ok(());
        };
        let mut run = RunState {
            targets: job.targets.clone(),
            job,
            output_dir,
            failed_targets: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        };

        match self.run_stages(&mut run, &workdir).await? {
            Ok(()) => self.finish(&run).await,
            Err(Halt::Canceled) => {
                info!("Job canceled");
                Ok(())
            }
            Err(Halt::Vanished) => {
                info!("Job deleted mid-run");
                Ok(())
            }
            Err(Halt::Failed) => Ok(()),
        }
    }

    async fn run_stages(
        &self,
        run: &mut RunState,
        workdir: &Path,
    ) -> Result<std::result::Result<(), Halt>> {
        let job_id = run.job.id.clone();

        // INGESTION
        if let Err(halt) = self.checkpoint(&job_id, None).await? {
            return Ok(Err(halt));
        }
        let ingestion = match self
            .ingestor
            .ingest(&run.job.source_ref, workdir, run.job.mock_mode)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.fail_job(&job_id, format!("INGESTION 실패: {}", e.detail())).await?;
                return Ok(Err(Halt::Failed));
            }
        };
        run.warnings.extend(ingestion.warnings.iter().cloned());

        if run.wants(Target::ShortsVideos) && ingestion.video_path.is_none() && !run.job.mock_mode {
            run.targets.retain(|t| *t != Target::ShortsVideos);
            run.warnings.push(SHORTS_SKIPPED_WARNING.to_string());
            info!("No source video, shorts-videos dropped");
        }

        // PLANNER
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::Planner)).await? {
            return Ok(Err(halt));
        }
        let planned = match self.plan(run, &ingestion).await {
            Ok(planned) => planned,
            Err(e) => {
                self.fail_job(&job_id, format!("PLANNER 실패: {}", e.detail())).await?;
                return Ok(Err(Halt::Failed));
            }
        };
        let Planned {
            brief,
            prompts,
            variables,
        } = planned;

        // TEXT_AGENTS
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::TextAgents)).await? {
            return Ok(Err(halt));
        }
        let input = TextAgentInput {
            job_id: job_id.clone(),
            brief: brief.clone(),
            source_text: ingestion.text.clone(),
            output_dir: run.output_dir.clone(),
            tone: run.job.tone.clone(),
            language: run.job.language.clone(),
            mock: run.job.mock_mode,
            prompts: prompts.clone(),
            variables,
        };
        let text = self.text_agents.generate(input, &run.targets).await;
        run.failures.extend(text.failures);
        run.failed_targets.extend(text.failed_targets);

        // VISUAL
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::Visual)).await? {
            return Ok(Err(halt));
        }
        let want_card_news = run.wants(Target::CardNews);
        let want_thumbnail = run.wants(Target::Thumbnail);
        if want_card_news || want_thumbnail {
            let result = self
                .visuals
                .generate_assets(
                    &brief,
                    &run.output_dir,
                    &prompts,
                    run.job.mock_mode,
                    want_card_news,
                    want_thumbnail,
                )
                .await;
            absorb(run, "VISUAL", result.map(|a| a.warnings));
        }

        // CHART
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::Chart)).await? {
            return Ok(Err(halt));
        }
        if run.wants(Target::Chart) {
            let result = self
                .charts
                .generate_assets(&brief, &run.output_dir, &prompts, run.job.mock_mode)
                .await;
            absorb(run, "CHART", result.map(|a| a.warnings));
        }

        // SHORTS
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::Shorts)).await? {
            return Ok(Err(halt));
        }
        if run.wants(Target::ShortsVideos) {
            let request = ShortsRequest {
                source_ref: run.job.source_ref.clone(),
                video_path: ingestion.video_path.clone(),
                scripts_dir: run.output_dir.join(layout::SHORTS_SCRIPTS_DIR),
                output_dir: run.output_dir.join(layout::SHORTS_VIDEOS_DIR),
                mock: run.job.mock_mode,
                clip_count: SHORTS_CLIP_COUNT,
            };
            let result = self.shorts.generate_assets(&request).await;
            absorb(run, "SHORTS", result.map(|a| a.warnings));
        }

        // REVIEW
        if let Err(halt) = self.checkpoint(&job_id, Some(Stage::Review)).await? {
            return Ok(Err(halt));
        }
        let outcome = self
            .reviewer
            .review(
                &run.output_dir,
                &run.targets,
                &run.failed_targets,
                &run.failures,
                &run.warnings,
            )
            .await?;
        run.failures.extend(outcome.failures);

        Ok(Ok(()))
    }

    async fn plan(&self, run: &RunState, ingestion: &IngestionResult) -> Result<Planned> {
        let prompts = self.prompts.load_prompt_map().await?;
        let variables = self.prompts.load_variable_map().await?;
        let key_messages = extract_key_messages(&ingestion.title, &ingestion.text, KEY_MESSAGE_COUNT);

        let input = BriefInput {
            job: &run.job,
            ingestion,
            targets: &run.targets,
            warnings: &run.warnings,
            key_messages: &key_messages,
        };
        let brief = build_brief(&input, &prompts, &variables, self.text_agents.providers()).await;
        tokio::fs::write(run.output_dir.join(layout::BRIEF), &brief).await?;

        Ok(Planned {
            brief,
            prompts,
            variables,
        })
    }

    /// Honor a pending cancel, then enter `next` (if any).
    async fn checkpoint(
        &self,
        job_id: &str,
        next: Option<Stage>,
    ) -> Result<std::result::Result<(), Halt>> {
        let Some(job) = self.jobs.find_by_id(job_id).await? else {
            return Ok(Err(Halt::Vanished));
        };
        if job.cancel_requested {
            let patch = JobPatch::new()
                .status(JobStatus::Canceled)
                .stage(Stage::Done)
                .finished_at(self.time.now_millis());
            self.jobs.update(job_id, &patch).await?;
            return Ok(Err(Halt::Canceled));
        }
        if let Some(stage) = next {
            self.jobs.update(job_id, &JobPatch::new().stage(stage)).await?;
            info!(stage = %stage, "Stage started");
        }
        Ok(Ok(()))
    }

    async fn fail_job(&self, job_id: &str, message: String) -> Result<()> {
        warn!(error = %message, "Job failed");
        let patch = JobPatch::new()
            .status(JobStatus::Failed)
            .stage(Stage::Done)
            .error_message(Some(message))
            .finished_at(self.time.now_millis());
        self.jobs.update(job_id, &patch).await?;
        Ok(())
    }

    async fn finish(&self, run: &RunState) -> Result<()> {
        let status = if run.failures.is_empty() {
            JobStatus::Succeeded
        } else {
            JobStatus::PartialSuccess
        };
        let patch = JobPatch::new()
            .status(status)
            .stage(Stage::Done)
            .error_message(summarize_failures(&run.failures))
            .finished_at(self.time.now_millis());
        self.jobs.update(&run.job.id, &patch).await?;
        info!(
            status = %status,
            failures = run.failures.len(),
            warnings = run.warnings.len(),
            "Job finished"
        );
        Ok(())
    }
}

struct Planned {
    brief: String,
    prompts: PromptMap,
    variables: VariableMap,
}

/// Fold a soft-failable stage result into the run.
fn absorb(run: &mut RunState, stage: &str, result: Result<Vec<String>>) {
    match result {
        Ok(warnings) => run.warnings.extend(warnings),
        Err(e) => {
            warn!(job_id = %run.job.id, stage, error = %e, "Stage failed, continuing");
            run.failures.push(format!("{} 실패: {}", stage, e.detail()));
        }
    }
}

#[async_trait]
impl JobProcessor for Orchestrator {
    async fn process(&self, job_id: &str) {
        let Err(e) = self.process_job(job_id).await else {
            return;
        };
        error!(job_id = %job_id, error = %e, "Pipeline aborted");
        // Best effort: the store may be the thing that failed
        if let Err(e) = self.fail_job(job_id, format!("pipeline error: {}", e)).await {
            error!(job_id = %job_id, error = %e, "Failed to record pipeline error");
        }
    }
}
