//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server for ContentForge jobs and prompt templates.
//! Methods are versioned (`job.create.v1`, `prompt.list.v1`, ...).

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
