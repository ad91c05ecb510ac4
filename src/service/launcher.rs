use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// A shell command that could not be started or exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Command failed: {command}\n{detail}")]
pub struct ExecutionError {
    pub command: String,
    pub detail: String,
}

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Runs `command_line` to completion and returns its stdout.
    ///
    /// Stdout of a failed command is discarded, only the exit status and
    /// stderr end up in the error.
    async fn run(&self, command_line: &str) -> Result<String, ExecutionError>;
}

/// Runs command lines through `sh -c` in the bot's working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    async fn run(&self, command_line: &str) -> Result<String, ExecutionError> {
        log::debug!("Running `{command_line}`");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExecutionError {
                command: command_line.to_string(),
                detail: format!("unable to spawn process: {e}"),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim_end();
        let detail = if stderr.is_empty() {
            output.status.to_string()
        } else {
            format!("{}\n{stderr}", output.status)
        };

        log::error!("`{command_line}` failed: {detail}");
        Err(ExecutionError {
            command: command_line.to_string(),
            detail,
        })
    }
}
