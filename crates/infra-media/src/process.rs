// External command runner (ffmpeg, ffprobe, yt-dlp)
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use contentforge_core::error::{AppError, Result};

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Error out on a non-zero exit, using stderr as the message.
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let stderr = self.stderr.trim();
        let message = if stderr.is_empty() {
            format!("{} exited with {:?}", program, self.exit_code)
        } else {
            stderr.to_string()
        };
        Err(AppError::Execution(message))
    }
}

/// Spawns child processes with a hard timeout.
///
/// Children are killed when the timeout elapses or the future is dropped.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `program` and capture its output. A non-zero exit is not an error.
    pub async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.run_in(program, args, None).await
    }

    /// Run and fail on a non-zero exit.
    pub async fn run_checked(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.run(program, args).await?.check(program)
    }

    pub async fn run_in(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput> {
        let started = Instant::now();
        debug!(program, args = ?args, "Starting command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| AppError::Execution(format!("failed to spawn {}: {}", program, e)))?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AppError::Io(e)),
            Err(_) => {
                warn!(program, timeout_secs = self.timeout.as_secs(), "Command timed out");
                return Err(AppError::Execution(format!(
                    "{} timed out after {}s",
                    program,
                    self.timeout.as_secs()
                )));
            }
        };

        let result = CommandOutput::from_output(output);
        info!(
            program,
            duration_ms = started.elapsed().as_millis() as u64,
            exit_code = ?result.exit_code,
            "Command finished"
        );
        Ok(result)
    }
}

/// Convenience for building argument vectors from string literals.
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let out = runner
            .run("sh", &args(["-c", "echo hello; exit 3"]))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_check_uses_stderr() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let err = runner
            .run_checked("sh", &args(["-c", "echo broken >&2; exit 1"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = CommandRunner::new(Duration::from_millis(100));
        let err = runner.run("sleep", &args(["5"])).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_program_is_execution_error() {
        let runner = CommandRunner::new(Duration::from_secs(1));
        let err = runner
            .run("definitely-not-a-real-binary-xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Execution(_)));
    }
}
