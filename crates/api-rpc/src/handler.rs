//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the job service and prompt store.

use crate::error::to_rpc_error;
use crate::types::{
    ArtifactPathRequest, ArtifactPathResponse, ArtifactsResponse, CancelResponse,
    DeleteVariableRequest, DeleteVariableResponse, JobIdRequest, ListJobsRequest,
    ListJobsResponse, PromptListResponse, UpdatePromptRequest, UpsertVariableRequest,
    MAX_LIST_LIMIT,
};
use contentforge_core::application::{CreateJobRequest, JobService};
use contentforge_core::domain::{Job, PromptTemplate, PromptVariable};
use contentforge_core::port::PromptStore;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::info;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    jobs: Arc<JobService>,
    prompts: Arc<dyn PromptStore>,
}

impl RpcHandler {
    pub fn new(jobs: Arc<JobService>, prompts: Arc<dyn PromptStore>) -> Self {
        Self { jobs, prompts }
    }

    /// job.create.v1
    pub async fn create_job(&self, params: CreateJobRequest) -> RpcResult<Job> {
        self.jobs.create(params).await.map_err(to_rpc_error)
    }

    /// job.get.v1
    pub async fn get_job(&self, params: JobIdRequest) -> RpcResult<Job> {
        self.jobs.get(&params.job_id).await.map_err(to_rpc_error)
    }

    /// job.list.v1
    pub async fn list_jobs(&self, params: ListJobsRequest) -> RpcResult<ListJobsResponse> {
        let limit = params.limit.clamp(1, MAX_LIST_LIMIT);
        let jobs = self.jobs.list(limit).await.map_err(to_rpc_error)?;
        Ok(ListJobsResponse { jobs })
    }

    /// job.cancel.v1
    pub async fn cancel_job(&self, params: JobIdRequest) -> RpcResult<CancelResponse> {
        let status = self
            .jobs
            .cancel(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(CancelResponse {
            job_id: params.job_id,
            status: status.as_str().to_string(),
        })
    }

    /// job.retry.v1
    pub async fn retry_job(&self, params: JobIdRequest) -> RpcResult<Job> {
        self.jobs.retry(&params.job_id).await.map_err(to_rpc_error)
    }

    /// job.artifacts.v1
    pub async fn artifacts(&self, params: JobIdRequest) -> RpcResult<ArtifactsResponse> {
        let artifacts = self
            .jobs
            .artifacts(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(ArtifactsResponse {
            job_id: params.job_id,
            artifacts,
        })
    }

    /// job.artifact_path.v1
    pub async fn artifact_path(
        &self,
        params: ArtifactPathRequest,
    ) -> RpcResult<ArtifactPathResponse> {
        let path = self
            .jobs
            .artifact_path(&params.job_id, &params.path)
            .await
            .map_err(to_rpc_error)?;
        Ok(ArtifactPathResponse {
            job_id: params.job_id,
            path: path.to_string_lossy().into_owned(),
        })
    }

    /// prompt.list.v1
    pub async fn list_prompts(&self) -> RpcResult<PromptListResponse> {
        let templates = self.prompts.list_templates().await.map_err(to_rpc_error)?;
        let variables = self
            .prompts
            .load_variable_map()
            .await
            .map_err(to_rpc_error)?;
        Ok(PromptListResponse {
            templates,
            variables,
        })
    }

    /// prompt.update.v1
    pub async fn update_prompt(&self, params: UpdatePromptRequest) -> RpcResult<PromptTemplate> {
        let template = self
            .prompts
            .update_template(&params.key, &params.content)
            .await
            .map_err(to_rpc_error)?;
        info!(key = %template.key, "Prompt template updated");
        Ok(template)
    }

    /// prompt.variable.upsert.v1
    pub async fn upsert_variable(&self, params: UpsertVariableRequest) -> RpcResult<PromptVariable> {
        self.prompts
            .upsert_variable(&params.variable)
            .await
            .map_err(to_rpc_error)
    }

    /// prompt.variable.delete.v1
    pub async fn delete_variable(
        &self,
        params: DeleteVariableRequest,
    ) -> RpcResult<DeleteVariableResponse> {
        let deleted = self
            .prompts
            .delete_variable(&params.prompt_key, &params.name)
            .await
            .map_err(to_rpc_error)?;
        Ok(DeleteVariableResponse { deleted })
    }
}
