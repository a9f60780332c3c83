// Create Job Use Case

use crate::domain::{normalize_targets, Job, JobId, Target, DEFAULT_TARGETS, MARKDOWN_PREFIX};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRepository, TimeProvider};
use serde::{Deserialize, Serialize};

/// Create request as received from the API.
///
/// `source_markdown` wins over `source_url` when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub source_markdown: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Raw target names; aliases allowed. `None` means the default set.
    #[serde(default)]
    pub targets: Option<Vec<String>>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub mock_mode: bool,
}

/// Values used when a request leaves tone/language blank
#[derive(Debug, Clone)]
pub struct JobDefaults {
    pub tone: String,
    pub language: String,
}

/// Validated form of a request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub source_ref: String,
    pub targets: Vec<Target>,
}

/// Check the source and normalize targets.
pub fn validate_request(req: &CreateJobRequest) -> Result<ValidatedRequest> {
    let source_ref = resolve_source(req)?;
    let targets = match &req.targets {
        None => DEFAULT_TARGETS.to_vec(),
        Some(raw) => normalize_targets(raw).map_err(|e| AppError::Validation(e.to_string()))?,
    };
    Ok(ValidatedRequest {
        source_ref,
        targets,
    })
}

fn resolve_source(req: &CreateJobRequest) -> Result<String> {
    let markdown = req
        .source_markdown
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(markdown) = markdown {
        return Ok(format!("{}{}", MARKDOWN_PREFIX, markdown));
    }

    let url = req
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("source_markdown or source_url is required".into()))?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Validation(
            "source_url must start with http:// or https://".into(),
        ));
    }
    Ok(url.to_string())
}

fn non_blank_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Validate, then insert a PENDING job. Enqueuing is the caller's job.
pub async fn execute(
    job_repo: &dyn JobRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    defaults: &JobDefaults,
    req: CreateJobRequest,
) -> Result<Job> {
    let validated = validate_request(&req)?;

    let job_id: JobId = id_provider.generate_id();
    let job = Job::new(
        job_id,
        time_provider.now_millis(),
        validated.source_ref,
        validated.targets,
        non_blank_or(req.tone.as_deref(), &defaults.tone),
        non_blank_or(req.language.as_deref(), &defaults.language),
        req.mock_mode,
    );
    job_repo.insert(&job).await?;
    Ok(job)
}
