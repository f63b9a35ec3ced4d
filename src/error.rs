//! Error types for gitsync
//!
//! Every failure of a sync run is terminal. The variants carry enough
//! context to print a useful diagnostic and a remediation hint.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::sync::Outcome;

/// The main error type for gitsync operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Repository Errors
    // ==========================================================================
    #[error("{} is not inside a git working copy", describe_location(path))]
    NotARepository { path: Option<PathBuf> },

    #[error("HEAD is detached; check out a branch before syncing")]
    DetachedHead,

    // ==========================================================================
    // Remote Errors
    // ==========================================================================
    #[error("Failed to fetch from '{remote}': {message}")]
    NetworkOrFetch { remote: String, message: String },

    #[error("Push of '{branch}' to '{remote}' was rejected: {message}")]
    PushRejected {
        remote: String,
        branch: String,
        message: String,
    },

    #[error("Pull of '{remote}/{branch}' failed: {message}")]
    PullFailed {
        remote: String,
        branch: String,
        message: String,
    },

    // ==========================================================================
    // Conflict Errors
    // ==========================================================================
    #[error("Rebase onto '{remote}/{branch}' stopped on conflicts: {message}")]
    RebaseConflict {
        remote: String,
        branch: String,
        message: String,
    },

    #[error("Merge of '{remote}/{branch}' left conflicts{}", format_paths(paths))]
    MergeConflict {
        remote: String,
        branch: String,
        paths: Vec<String>,
    },

    // ==========================================================================
    // Stash Errors
    // ==========================================================================
    #[error("Failed to stash local changes: {message}")]
    StashFailed { message: String },

    #[error("git stash pop failed: {message}")]
    StashPopFailed { message: String },

    #[error("Sync finished ({outcome}) but the auto-stash could not be restored: {source}")]
    StashRestore {
        outcome: Outcome,
        #[source]
        source: Box<Error>,
    },

    #[error("{primary}; the auto-stash could not be restored either: {restore}")]
    RestoreAfterFailure {
        #[source]
        primary: Box<Error>,
        restore: Box<Error>,
    },

    // ==========================================================================
    // CLI Errors
    // ==========================================================================
    #[error("Unknown option '{option}'")]
    UnknownOption { option: String },

    // ==========================================================================
    // Git Invocation Errors
    // ==========================================================================
    #[error("'git {command}' did not finish within {}s", timeout.as_secs())]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Failed to run 'git {command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Git operation failed: {message}")]
    Git {
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    // ==========================================================================
    // Config Errors
    // ==========================================================================
    #[error("Invalid config file '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    // ==========================================================================
    // Catch-all
    // ==========================================================================
    #[error("{0}")]
    Other(String),
}

/// Result type alias for gitsync operations
pub type Result<T> = std::result::Result<T, Error>;

fn describe_location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("'{}'", path.display()),
        None => "The current directory".to_string(),
    }
}

fn format_paths(paths: &[String]) -> String {
    if paths.is_empty() {
        String::new()
    } else {
        format!(" in: {}", paths.join(", "))
    }
}

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git {
            message: err.message().to_string(),
            source: Some(err),
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// The error a compound failure started from
    pub fn primary(&self) -> &Error {
        match self {
            Error::RestoreAfterFailure { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NotARepository { .. } => Some("Run git-sync from inside a git working copy"),
            Error::DetachedHead => Some("Switch to a branch with: git switch <branch>"),
            Error::NetworkOrFetch { .. } => {
                Some("Check your network connection and the remote URL, then re-run")
            }
            Error::PushRejected { .. } => {
                Some("Someone pushed in the meantime; re-run git-sync to integrate their changes")
            }
            Error::RebaseConflict { .. } => Some(
                "Resolve the conflicts, then run 'git rebase --continue' (or 'git rebase --abort') and re-run",
            ),
            Error::MergeConflict { .. } => Some(
                "Resolve the conflicts, commit the merge (or 'git merge --abort') and re-run",
            ),
            Error::StashPopFailed { .. }
            | Error::StashRestore { .. }
            | Error::RestoreAfterFailure { .. } => Some(
                "Your changes are still saved: inspect 'git stash list' and apply them with 'git stash pop'",
            ),
            Error::UnknownOption { .. } => Some("Run 'git-sync --help' for the supported options"),
            Error::CommandTimeout { .. } => Some("Increase --timeout or check what git is waiting on"),
            _ => None,
        }
    }

    /// Returns true if the run stopped because histories conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.primary(),
            Error::RebaseConflict { .. } | Error::MergeConflict { .. }
        )
    }

    /// Terminal outcome reported for a failed run
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::StashRestore { outcome, .. } => *outcome,
            _ if self.is_conflict() => Outcome::ConflictDetected,
            _ => Outcome::OperationFailed,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        1
    }
}
