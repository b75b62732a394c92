//! Host process execution for the privileged relay.
//!
//! Commands are spawned directly with an argument vector; no shell is
//! involved, so allow-listed arguments cannot be reinterpreted.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::RelayError;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// A non-zero exit is a [`RelayError::CommandFailed`] carrying stderr.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RelayError>;
}

/// Spawns real host processes, killing them when `timeout` expires.
#[derive(Debug, Clone)]
pub struct HostCommandRunner {
    timeout: Duration,
}

impl HostCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for HostCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RelayError> {
        let command_line = display_command(program, args);
        tracing::info!(command = %command_line, "Executing host command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RelayError::CommandFailed {
                command: command_line.clone(),
                reason: format!("failed to spawn: {}", e),
                stderr: String::new(),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RelayError::CommandFailed {
                command: command_line.clone(),
                reason: e.to_string(),
                stderr: String::new(),
            })?,
            Err(_) => {
                return Err(RelayError::CommandTimedOut {
                    command: command_line,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(RelayError::CommandFailed {
                command: command_line,
                reason: output.status.to_string(),
                stderr,
            });
        }
        Ok(CommandOutput { stdout, stderr })
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = HostCommandRunner::new(Duration::from_secs(5));
        let output = runner.run("echo", &args(&["ph-n8n", "restarted"])).await.unwrap();
        assert_eq!(output.stdout.trim(), "ph-n8n restarted");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let runner = HostCommandRunner::new(Duration::from_secs(5));
        let output = runner.run("echo", &args(&["$(id)", ";", "ls"])).await.unwrap();
        assert_eq!(output.stdout.trim(), "$(id) ; ls");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let runner = HostCommandRunner::new(Duration::from_secs(5));
        let err = runner.run("false", &[]).await.unwrap_err();
        assert!(matches!(err, RelayError::CommandFailed { ref command, .. } if command == "false"));
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let runner = HostCommandRunner::new(Duration::from_secs(5));
        let err = runner
            .run("/nonexistent/toolgate-cli", &args(&["start", "x"]))
            .await
            .unwrap_err();
        match err {
            RelayError::CommandFailed { reason, .. } => assert!(reason.contains("spawn")),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = HostCommandRunner::new(Duration::from_millis(50));
        let err = runner.run("sleep", &args(&["5"])).await.unwrap_err();
        assert!(matches!(err, RelayError::CommandTimedOut { .. }));
    }
}
