//! JSON-RPC Server
//!
//! Serves the JSON-RPC 2.0 API over HTTP/WebSocket on a local TCP port.

use crate::handler::RpcHandler;
use crate::types::{
    ArtifactPathRequest, DeleteVariableRequest, JobIdRequest, ListJobsRequest,
    UpdatePromptRequest, UpsertVariableRequest,
};
use contentforge_core::application::CreateJobRequest;
use contentforge_core::error::{AppError, Result};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

fn register_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("failed to register RPC method: {}", e))
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    fn module(&self) -> Result<RpcModule<RpcHandler>> {
        let mut module = RpcModule::from_arc(Arc::clone(&self.handler));

        module
            .register_async_method("job.create.v1", |params, handler, _| async move {
                let req: CreateJobRequest = params.parse()?;
                handler.create_job(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.get.v1", |params, handler, _| async move {
                let req: JobIdRequest = params.parse()?;
                handler.get_job(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.list.v1", |params, handler, _| async move {
                let req: ListJobsRequest = if params.is_object() {
                    params.parse()?
                } else {
                    ListJobsRequest { limit: 50 }
                };
                handler.list_jobs(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.cancel.v1", |params, handler, _| async move {
                let req: JobIdRequest = params.parse()?;
                handler.cancel_job(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.retry.v1", |params, handler, _| async move {
                let req: JobIdRequest = params.parse()?;
                handler.retry_job(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.artifacts.v1", |params, handler, _| async move {
                let req: JobIdRequest = params.parse()?;
                handler.artifacts(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("job.artifact_path.v1", |params, handler, _| async move {
                let req: ArtifactPathRequest = params.parse()?;
                handler.artifact_path(req).await
            })
            .map_err(register_error)?;

        // Prompt templates
        module
            .register_async_method("prompt.list.v1", |_, handler, _| async move {
                handler.list_prompts().await
            })
            .map_err(register_error)?;

        module
            .register_async_method("prompt.update.v1", |params, handler, _| async move {
                let req: UpdatePromptRequest = params.parse()?;
                handler.update_prompt(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("prompt.variable.upsert.v1", |params, handler, _| async move {
                let req: UpsertVariableRequest = params.parse()?;
                handler.upsert_variable(req).await
            })
            .map_err(register_error)?;

        module
            .register_async_method("prompt.variable.delete.v1", |params, handler, _| async move {
                let req: DeleteVariableRequest = params.parse()?;
                handler.delete_variable(req).await
            })
            .map_err(register_error)?;

        Ok(module)
    }

    /// Bind and start serving. Returns the bound address and the handle used
    /// to stop the server.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder().build(&addr).await.map_err(|e| {
            AppError::Internal(format!("Failed to build server on {}: {}", addr, e))
        })?;
        let local_addr = server.local_addr()?;

        let handle = server.start(module);
        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
