//! Running the `git` executable
//!
//! Each invocation is awaited to completion before the caller continues.
//! Output is captured, logged at debug level and handed back for the caller
//! to interpret.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit status was zero
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// A successful run with no output
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// A failed run reporting `stderr`
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// The most useful text to show the user: stderr, else stdout
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        if self.success {
            "no output".to_string()
        } else {
            "git exited with a non-zero status".to_string()
        }
    }
}

/// Runs git commands in a working copy
#[derive(Debug, Clone)]
pub struct GitCommand {
    workdir: PathBuf,
    timeout: Option<Duration>,
}

impl GitCommand {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: None,
        }
    }

    /// Abort any single invocation that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git <args>` and capture its output
    pub async fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let shown = args.join(" ");
        tracing::debug!(command = %shown, "running git");

        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let pending = command.output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(Error::CommandTimeout {
                        command: shown.clone(),
                        timeout: limit,
                    })
                }
            },
            None => pending.await,
        }
        .map_err(|source| Error::CommandSpawn {
            command: shown.clone(),
            source,
        })?;

        let result = GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            command = %shown,
            success = result.success,
            stdout = %result.stdout.trim(),
            stderr = %result.stderr.trim(),
            "git finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_stderr() {
        let out = GitOutput {
            success: false,
            stdout: "Auto-merging a.txt\n".to_string(),
            stderr: "error: failed to push\n".to_string(),
        };
        assert_eq!(out.message(), "error: failed to push");
    }

    #[test]
    fn test_message_falls_back_to_stdout() {
        let out = GitOutput {
            success: false,
            stdout: "CONFLICT (content): Merge conflict in a.txt\n".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(out.message(), "CONFLICT (content): Merge conflict in a.txt");
    }

    #[test]
    fn test_message_when_silent() {
        assert_eq!(GitOutput::ok().message(), "no output");
        assert_eq!(
            GitOutput::failed("").message(),
            "git exited with a non-zero status"
        );
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let git = GitCommand::new(tmp.path());

        let Ok(out) = git.run(&["--version"]).await else {
            // git not installed
            return;
        };
        assert!(out.success);
        assert!(out.stdout.starts_with("git version"));

        let out = git.run(&["no-such-subcommand"]).await.unwrap();
        assert!(!out.success);
        assert!(!out.message().is_empty());
    }
}
