// Application Layer - Use Cases and Business Logic

pub mod job_service;
pub mod maintenance;
pub mod pipeline;
pub mod recovery;
pub mod retry;
pub mod worker;

// Re-exports
pub use job_service::{CreateJobRequest, JobDefaults, JobService};
pub use maintenance::{RetentionConfig, RetentionScheduler, RetentionService};
pub use pipeline::{Orchestrator, PipelineDeps};
pub use recovery::{RecoveryReport, RecoveryService};
pub use retry::BackoffPolicy;
pub use worker::{shutdown_channel, JobProcessor, ShutdownSender, ShutdownToken, TaskQueue};
