//! Daemon settings
//!
//! Built once at startup from built-in defaults, an optional
//! `contentforge.toml` in the working directory, then `CONTENTFORGE_*`
//! environment variables (e.g. `CONTENTFORGE_OPENAI_API_KEY`).

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "contentforge";
const ENV_PREFIX: &str = "CONTENTFORGE";
const SQLITE_SCHEME: &str = "sqlite://";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub output_root: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub retention_days: u32,
    pub max_jobs: usize,
    pub worker_poll_ms: u64,
    pub default_language: String,
    pub default_tone: String,

    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub nanobanana_api_url: String,
    pub nanobanana_api_key: String,
    pub nanobanana_model: String,
    pub whisper_base_url: String,
    pub whisper_model: String,
    /// Empty means no text on fallback images
    pub font_path: String,

    pub request_timeout_seconds: u64,
    pub command_timeout_seconds: u64,

    /// `pretty` or `json`
    pub log_format: String,
    /// Daily rolling JSON log files are written here when set
    pub log_dir: String,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("database_url", "sqlite://~/.contentforge/contentforge.db")?
        .set_default("output_root", "~/.contentforge/outputs")?
        .set_default("rpc_host", "127.0.0.1")?
        .set_default("rpc_port", 9630)?
        .set_default("retention_days", 7)?
        .set_default("max_jobs", 200)?
        .set_default("worker_poll_ms", 500)?
        .set_default("default_language", "ko")?
        .set_default("default_tone", "친근하고 실용적")?
        .set_default("openai_api_key", "")?
        .set_default("openai_model", "gpt-4.1-mini")?
        .set_default("openai_base_url", "https://api.openai.com/v1")?
        .set_default("anthropic_api_key", "")?
        .set_default("anthropic_model", "claude-3-5-sonnet-latest")?
        .set_default("anthropic_base_url", "https://api.anthropic.com/v1")?
        .set_default("nanobanana_api_url", "")?
        .set_default("nanobanana_api_key", "")?
        .set_default("nanobanana_model", "gemini-3-pro-image-preview")?
        .set_default("whisper_base_url", "")?
        .set_default("whisper_model", "whisper-1")?
        .set_default("font_path", "")?
        .set_default("request_timeout_seconds", 120)?
        .set_default("command_timeout_seconds", 900)?
        .set_default("log_format", "pretty")?
        .set_default("log_dir", "")?)
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::build(Some(Path::new(CONFIG_FILE)), None)
    }

    /// `env` replaces the process environment when given.
    fn build(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// `database_url` with `~` expanded in the file path
    pub fn database_url(&self) -> String {
        match self.database_url.strip_prefix(SQLITE_SCHEME) {
            Some(path) => format!("{}{}", SQLITE_SCHEME, shellexpand::tilde(path)),
            None => self.database_url.clone(),
        }
    }

    /// Parent directory of a file-backed database
    pub fn database_dir(&self) -> Option<PathBuf> {
        let url = self.database_url();
        let path = url.strip_prefix(SQLITE_SCHEME)?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.contains(":memory:") {
            return None;
        }
        Path::new(path).parent().map(Path::to_path_buf)
    }

    pub fn output_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_root).into_owned())
    }

    pub fn font_path(&self) -> Option<String> {
        let path = self.font_path.trim();
        (!path.is_empty()).then(|| shellexpand::tilde(path).into_owned())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        let dir = self.log_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_ms)
    }
}
