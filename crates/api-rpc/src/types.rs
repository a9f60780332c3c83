//! RPC Request/Response Types
//!
//! Parameters and results of the versioned JSON-RPC methods.

use contentforge_core::domain::{Artifact, Job, PromptTemplate, PromptVariable, VariableMap};
use serde::{Deserialize, Serialize};

/// job.get.v1 / job.cancel.v1 / job.retry.v1 / job.artifacts.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct JobIdRequest {
    pub job_id: String,
}

/// job.list.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct ListJobsRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Upper bound for job.list.v1
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsResponse {
    pub job_id: String,
    pub artifacts: Vec<Artifact>,
}

/// job.artifact_path.v1 - Resolve a downloadable artifact
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactPathRequest {
    pub job_id: String,
    /// Relative to the job directory, e.g. `visuals/thumbnail.png`
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPathResponse {
    pub job_id: String,
    pub path: String,
}

/// prompt.list.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListResponse {
    pub templates: Vec<PromptTemplate>,
    pub variables: VariableMap,
}

/// prompt.update.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePromptRequest {
    pub key: String,
    pub content: String,
}

/// prompt.variable.upsert.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertVariableRequest {
    pub variable: PromptVariable,
}

/// prompt.variable.delete.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteVariableRequest {
    pub prompt_key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVariableResponse {
    pub deleted: bool,
}
