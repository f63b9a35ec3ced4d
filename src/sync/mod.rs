//! Synchronizing a branch with its remote
//!
//! # Procedure
//!
//! 1. **Fetch** the remote. Nothing has been mutated yet, so a failure
//!    simply ends the run.
//! 2. **Classify** the branch: no remote counterpart, up to date, ahead,
//!    behind, or diverged.
//! 3. **Stash** uncommitted and untracked changes, unless the branch only
//!    needs publishing or nothing needs doing.
//! 4. **Reconcile**: push, pull, or pull-then-push (merge or rebase).
//! 5. **Restore** the stash. This happens exactly once, whether step 4
//!    succeeded or not, and a failed restore is always reported.
//!
//! Running twice in a row with no intervening change yields
//! [`Outcome::UpToDate`] the second time.

use serde::Serialize;
use std::fmt;

use crate::config::{SyncOptions, DEFAULT_REMOTE, DEFAULT_STASH_PREFIX};
use crate::error::{Error, Result};
use crate::git::{Backend, PullMode};

mod plan;
mod stash;

pub use plan::{classify, plan, Action, Divergence, Relation};
pub use stash::{StashState, restore as restore_stash, stash_if_dirty};

/// Terminal result of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    UpToDate,
    Pushed,
    Pulled,
    RebasedAndPushed,
    MergedAndPushed,
    ConflictDetected,
    OperationFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::UpToDate => "up to date",
            Outcome::Pushed => "pushed",
            Outcome::Pulled => "pulled",
            Outcome::RebasedAndPushed => "rebased and pushed",
            Outcome::MergedAndPushed => "merged and pushed",
            Outcome::ConflictDetected => "conflict detected",
            Outcome::OperationFailed => "operation failed",
        };
        f.write_str(text)
    }
}

/// Branch, remote and options for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncContext {
    pub branch: String,
    pub remote: String,
    pub options: SyncOptions,
}

impl SyncContext {
    /// `<remote>/<branch>`
    pub fn remote_branch(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub context: SyncContext,
    /// `None` when the remote branch did not exist
    pub divergence: Option<Divergence>,
    pub action: Action,
    pub outcome: Outcome,
    /// Local changes were stashed and restored around the action
    pub stashed: bool,
}

/// Drives one sync run against a [`Backend`]
pub struct Synchronizer<B> {
    backend: B,
    remote: String,
    stash_prefix: String,
    options: SyncOptions,
}

impl<B: Backend> Synchronizer<B> {
    pub fn new(backend: B, options: SyncOptions) -> Self {
        Self {
            backend,
            remote: DEFAULT_REMOTE.to_string(),
            stash_prefix: DEFAULT_STASH_PREFIX.to_string(),
            options,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_stash_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stash_prefix = prefix.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run the full procedure once
    pub async fn synchronize(&self) -> Result<SyncReport> {
        if !self.backend.is_repository().await? {
            return Err(Error::NotARepository {
                path: self.backend.location(),
            });
        }

        let context = SyncContext {
            branch: self.backend.current_branch().await?,
            remote: self.remote.clone(),
            options: self.options,
        };
        tracing::info!(branch = %context.branch, remote = %context.remote, "syncing");

        let fetched = self.backend.fetch(&context.remote).await?;
        if !fetched.success {
            return Err(Error::NetworkOrFetch {
                remote: context.remote.clone(),
                message: fetched.message(),
            });
        }

        let divergence = self.divergence(&context).await?;
        let action = plan(divergence, &context.options);
        tracing::info!(
            relation = ?classify(divergence),
            ahead = divergence.map(|d| d.ahead),
            behind = divergence.map(|d| d.behind),
            %action,
            "planned"
        );

        let report = |outcome, stashed| SyncReport {
            context: context.clone(),
            divergence,
            action,
            outcome,
            stashed,
        };

        if action == Action::None || context.options.dry_run {
            return Ok(report(action.expected_outcome(), false));
        }

        if !action.needs_stash() {
            let outcome = self.execute(&context, action).await?;
            return Ok(report(outcome, false));
        }

        let stash = stash_if_dirty(&self.backend, &self.stash_prefix).await?;
        let stashed = stash.is_stashed();
        let result = self.execute(&context, action).await;

        match (result, restore_stash(&self.backend, stash).await) {
            (Ok(outcome), Ok(())) => Ok(report(outcome, stashed)),
            (Ok(outcome), Err(restore)) => Err(Error::StashRestore {
                outcome,
                source: Box::new(restore),
            }),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restore)) => Err(Error::RestoreAfterFailure {
                primary: Box::new(err),
                restore: Box::new(restore),
            }),
        }
    }

    /// Ahead/behind counts, or `None` if the remote branch does not exist
    async fn divergence(&self, context: &SyncContext) -> Result<Option<Divergence>> {
        let exists = self
            .backend
            .remote_branch_exists(&context.remote, &context.branch)
            .await?;
        if !exists {
            return Ok(None);
        }

        let remote = context.remote_branch();
        let ahead = self
            .backend
            .count_commits(&format!("{}..HEAD", remote))
            .await?;
        let behind = self
            .backend
            .count_commits(&format!("HEAD..{}", remote))
            .await?;

        Ok(Some(Divergence::new(ahead, behind)))
    }

    async fn execute(&self, context: &SyncContext, action: Action) -> Result<Outcome> {
        match action {
            Action::None => {}
            Action::Publish => self.push(context, true, false).await?,
            Action::Push { force } => self.push(context, false, force).await?,
            Action::Pull { mode } => self.pull(context, mode, false).await?,
            Action::Reconcile { mode } => {
                self.pull(context, mode, true).await?;
                self.push(context, false, false).await?;
            }
        }
        Ok(action.expected_outcome())
    }

    async fn push(&self, context: &SyncContext, set_upstream: bool, force: bool) -> Result<()> {
        if force {
            tracing::warn!(branch = %context.branch, "force-pushing over remote history");
        }

        let output = self
            .backend
            .push(&context.remote, &context.branch, set_upstream, force)
            .await?;
        if !output.success {
            return Err(Error::PushRejected {
                remote: context.remote.clone(),
                branch: context.branch.clone(),
                message: output.message(),
            });
        }
        Ok(())
    }

    /// Pull with `mode`. `reconcile` marks a pull on diverged history, where
    /// a refused merge can only mean conflicting changes.
    async fn pull(&self, context: &SyncContext, mode: PullMode, reconcile: bool) -> Result<()> {
        let no_edit = mode == PullMode::Merge;
        let output = self
            .backend
            .pull(&context.remote, &context.branch, mode, no_edit)
            .await?;

        if mode == PullMode::Rebase {
            if output.success {
                return Ok(());
            }
            return Err(Error::RebaseConflict {
                remote: context.remote.clone(),
                branch: context.branch.clone(),
                message: output.message(),
            });
        }

        // A merge can report success and still leave conflict markers behind
        let paths = self.unmerged_paths().await?;
        if !paths.is_empty() || (reconcile && !output.success) {
            return Err(Error::MergeConflict {
                remote: context.remote.clone(),
                branch: context.branch.clone(),
                paths,
            });
        }
        if !output.success {
            return Err(Error::PullFailed {
                remote: context.remote.clone(),
                branch: context.branch.clone(),
                message: output.message(),
            });
        }
        Ok(())
    }

    /// Paths left with conflict markers (`UU`, `AA`, `DD`, ...)
    async fn unmerged_paths(&self) -> Result<Vec<String>> {
        let entries = self.backend.status_porcelain().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.code.is_unmerged())
            .map(|entry| entry.path)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::MergedAndPushed.to_string(), "merged and pushed");
        assert_eq!(Outcome::UpToDate.to_string(), "up to date");
    }

    #[test]
    fn test_remote_branch() {
        let context = SyncContext {
            branch: "feature-x".to_string(),
            remote: "origin".to_string(),
            options: SyncOptions::default(),
        };
        assert_eq!(context.remote_branch(), "origin/feature-x");
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = SyncReport {
            context: SyncContext {
                branch: "main".to_string(),
                remote: "origin".to_string(),
                options: SyncOptions::default(),
            },
            divergence: Some(Divergence::new(2, 5)),
            action: Action::Reconcile {
                mode: PullMode::Rebase,
            },
            outcome: Outcome::RebasedAndPushed,
            stashed: true,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["branch"], "main");
        assert_eq!(json["divergence"]["behind"], 5);
        assert_eq!(json["action"]["action"], "reconcile");
        assert_eq!(json["action"]["mode"], "rebase");
        assert_eq!(json["outcome"], "rebased_and_pushed");
    }
}
