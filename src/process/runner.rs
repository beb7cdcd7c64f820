//! tokio-backed command runner.

use super::{CommandRunner, Invocation, OutputMode};
use crate::error::{CommandError, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Runner without a time limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that fails any command exceeding `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl CommandRunner for SystemRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<String> {
        let rendered = invocation.to_string();
        log::info!("Executing: {} (in {})", rendered, invocation.cwd().display());

        let mut command = tokio::process::Command::new(invocation.program());
        command
            .args(invocation.arguments())
            .current_dir(invocation.cwd())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if invocation.output_mode() == OutputMode::Inherit {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let spawned = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| CommandError::TimedOut {
                    command: rendered.clone(),
                    cwd: invocation.cwd().to_path_buf(),
                    seconds: limit.as_secs(),
                })?,
            None => command.output().await,
        };
        let output = spawned.map_err(|source| CommandError::Spawn {
            command: rendered.clone(),
            cwd: invocation.cwd().to_path_buf(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            log::error!("Failed: {rendered}");
            log::error!("Working directory: {}", invocation.cwd().display());
            if !stdout.trim().is_empty() {
                log::error!("stdout: {}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                log::error!("stderr: {}", stderr.trim_end());
            }
            return Err(CommandError::Failed {
                command: rendered,
                cwd: invocation.cwd().to_path_buf(),
                status: describe_status(output.status),
                stdout,
                stderr,
            }
            .into());
        }

        if invocation.output_mode() == OutputMode::Capture && !stdout.trim().is_empty() {
            log::debug!("{}", stdout.trim_end());
        }
        log::info!("Executed: {rendered}");
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    #[tokio::test]
    async fn test_captures_stdout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inv = Invocation::new("git", dir.path()).arg("--version");
        let out = SystemRunner::new().execute(&inv).await.expect("git --version");
        assert!(out.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_failure_carries_command_and_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inv = Invocation::git(dir.path()).args(["rev-parse", "HEAD"]);
        match SystemRunner::new().execute(&inv).await {
            Err(ReleaseError::Command(CommandError::Failed { command, cwd, stderr, .. })) => {
                assert_eq!(command, "git rev-parse HEAD");
                assert_eq!(cwd, dir.path());
                assert!(!stderr.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inv = Invocation::new("voidstone-definitely-missing", dir.path());
        let err = SystemRunner::new().execute(&inv).await.unwrap_err();
        assert!(matches!(err, ReleaseError::Command(CommandError::Spawn { .. })));
    }
}
