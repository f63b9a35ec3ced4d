//! Git backend for gitsync
//!
//! The synchronizer talks to version control only through [`Backend`], a
//! narrow capability set: fetch, push, pull, stash, status and commit
//! counting. [`GitRepository`] is the production implementation.
//!
//! # Split of responsibilities
//!
//! Read-only queries (branch, refs, commit counts, working-tree status) go
//! through libgit2. Anything that mutates the repository or talks to a
//! remote runs the `git` executable, so credentials, hooks and the
//! merge/rebase machinery behave exactly as they do for the user.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

mod command;
mod repository;
mod status;

pub use command::{GitCommand, GitOutput};
pub use repository::GitRepository;
pub use status::{StatusCode, StatusEntry};

/// How a pull integrates remote commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullMode {
    /// `git pull --no-rebase`
    Merge,
    /// `git pull --rebase`
    Rebase,
}

impl PullMode {
    pub fn from_rebase(rebase: bool) -> Self {
        if rebase {
            Self::Rebase
        } else {
            Self::Merge
        }
    }
}

impl fmt::Display for PullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullMode::Merge => f.write_str("merge"),
            PullMode::Rebase => f.write_str("rebase"),
        }
    }
}

/// Operations the synchronizer needs from version control.
///
/// Queries return their answer directly. Commands return a [`GitOutput`]
/// whose `success` flag mirrors the exit status; an `Err` means the command
/// could not be run at all.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// True when running inside a non-bare working copy
    async fn is_repository(&self) -> Result<bool>;

    /// Where the repository was found, for diagnostics
    fn location(&self) -> Option<PathBuf> {
        None
    }

    /// Name of the checked-out branch
    async fn current_branch(&self) -> Result<String>;

    async fn fetch(&self, remote: &str) -> Result<GitOutput>;

    /// Whether `refs/remotes/<remote>/<branch>` exists
    async fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool>;

    /// Number of commits in a revision range such as `origin/main..HEAD`
    async fn count_commits(&self, range: &str) -> Result<usize>;

    async fn push(
        &self,
        remote: &str,
        branch: &str,
        set_upstream: bool,
        force: bool,
    ) -> Result<GitOutput>;

    async fn pull(
        &self,
        remote: &str,
        branch: &str,
        mode: PullMode,
        no_edit: bool,
    ) -> Result<GitOutput>;

    /// Tracked files modified or deleted, staged or not
    async fn working_tree_dirty(&self) -> Result<bool>;

    /// Untracked, non-ignored files present
    async fn untracked_files_exist(&self) -> Result<bool>;

    /// Stage everything and stash it under `label`
    async fn stash_push(&self, label: &str) -> Result<GitOutput>;

    /// Pop the most recent stash entry
    async fn stash_pop(&self) -> Result<GitOutput>;

    /// Working-tree status, one entry per path
    async fn status_porcelain(&self) -> Result<Vec<StatusEntry>>;
}
