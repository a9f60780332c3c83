// ContentForge Infrastructure - SQLite Adapter
// Implements: JobRepository, PromptStore

mod connection;
mod error;
mod job_repository;
mod migration;
mod prompt_store;

pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use migration::run_migrations;
pub use prompt_store::SqlitePromptStore;

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
