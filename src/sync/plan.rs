//! Choosing a reconciliation strategy
//!
//! Planning is a pure function of the divergence between the two histories
//! (`None` when the remote branch does not exist) and the run's options.

use serde::Serialize;
use std::fmt;

use super::Outcome;
use crate::config::SyncOptions;
use crate::git::PullMode;

/// Commits on each side of `remote..HEAD`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// Reachable from HEAD but not from the remote tip
    pub ahead: usize,
    /// Reachable from the remote tip but not from HEAD
    pub behind: usize,
}

impl Divergence {
    pub fn new(ahead: usize, behind: usize) -> Self {
        Self { ahead, behind }
    }

    pub fn relation(&self) -> Relation {
        match (self.ahead, self.behind) {
            (0, 0) => Relation::UpToDate,
            (_, 0) => Relation::LocalOnly,
            (0, _) => Relation::RemoteOnly,
            (_, _) => Relation::Diverged,
        }
    }
}

/// How local history relates to the remote branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// No remote counterpart yet
    Unpublished,
    UpToDate,
    LocalOnly,
    RemoteOnly,
    Diverged,
}

/// What a sync run will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do
    None,
    /// Push with upstream tracking set
    Publish,
    Push { force: bool },
    Pull { mode: PullMode },
    /// Pull with `mode`, then push the result
    Reconcile { mode: PullMode },
}

impl Action {
    /// Outcome the action produces when it succeeds
    pub fn expected_outcome(&self) -> Outcome {
        match self {
            Action::None => Outcome::UpToDate,
            Action::Publish | Action::Push { .. } => Outcome::Pushed,
            Action::Pull { .. } => Outcome::Pulled,
            Action::Reconcile {
                mode: PullMode::Rebase,
            } => Outcome::RebasedAndPushed,
            Action::Reconcile {
                mode: PullMode::Merge,
            } => Outcome::MergedAndPushed,
        }
    }

    /// Whether local edits are stashed around this action
    pub fn needs_stash(&self) -> bool {
        !matches!(self, Action::None | Action::Publish)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::None => f.write_str("nothing to do"),
            Action::Publish => f.write_str("publish branch"),
            Action::Push { force: false } => f.write_str("push"),
            Action::Push { force: true } => f.write_str("force-push"),
            Action::Pull { mode } => write!(f, "pull ({})", mode),
            Action::Reconcile { mode } => write!(f, "pull ({}) and push", mode),
        }
    }
}

/// Classify the branch. `divergence` is `None` when the remote branch is missing.
pub fn classify(divergence: Option<Divergence>) -> Relation {
    match divergence {
        None => Relation::Unpublished,
        Some(divergence) => divergence.relation(),
    }
}

/// Pick the action for a branch
pub fn plan(divergence: Option<Divergence>, options: &SyncOptions) -> Action {
    let mode = PullMode::from_rebase(options.rebase);
    match classify(divergence) {
        Relation::Unpublished => Action::Publish,
        Relation::UpToDate => Action::None,
        Relation::LocalOnly => Action::Push {
            force: options.force,
        },
        Relation::RemoteOnly => Action::Pull { mode },
        Relation::Diverged => Action::Reconcile { mode },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(force: bool, rebase: bool) -> SyncOptions {
        SyncOptions {
            force,
            rebase,
            dry_run: false,
        }
    }

    #[test]
    fn test_relation_for_each_quadrant() {
        assert_eq!(Divergence::new(0, 0).relation(), Relation::UpToDate);
        assert_eq!(Divergence::new(3, 0).relation(), Relation::LocalOnly);
        assert_eq!(Divergence::new(0, 4).relation(), Relation::RemoteOnly);
        assert_eq!(Divergence::new(2, 5).relation(), Relation::Diverged);
        assert_eq!(classify(None), Relation::Unpublished);
    }

    #[test]
    fn test_plan_missing_remote_publishes() {
        assert_eq!(plan(None, &options(false, false)), Action::Publish);
        assert_eq!(plan(None, &options(false, true)), Action::Publish);
        assert_eq!(plan(None, &options(true, true)), Action::Publish);
    }

    #[test]
    fn test_plan_local_only() {
        let ahead = Some(Divergence::new(3, 0));
        assert_eq!(plan(ahead, &options(false, false)), Action::Push { force: false });
        assert_eq!(plan(ahead, &options(true, false)), Action::Push { force: true });
    }

    #[test]
    fn test_plan_remote_only() {
        let behind = Some(Divergence::new(0, 1));
        assert_eq!(
            plan(behind, &options(false, false)),
            Action::Pull { mode: PullMode::Merge }
        );
        assert_eq!(
            plan(behind, &options(true, true)),
            Action::Pull { mode: PullMode::Rebase }
        );
    }

    #[test]
    fn test_plan_diverged_ignores_force() {
        let diverged = Some(Divergence::new(2, 5));
        assert_eq!(
            plan(diverged, &options(true, false)),
            Action::Reconcile { mode: PullMode::Merge }
        );
        assert_eq!(
            plan(diverged, &options(false, true)),
            Action::Reconcile { mode: PullMode::Rebase }
        );
    }

    #[test]
    fn test_expected_outcomes() {
        assert_eq!(Action::None.expected_outcome(), Outcome::UpToDate);
        assert_eq!(Action::Publish.expected_outcome(), Outcome::Pushed);
        assert_eq!(
            Action::Reconcile { mode: PullMode::Rebase }.expected_outcome(),
            Outcome::RebasedAndPushed
        );
        assert!(!Action::Publish.needs_stash());
        assert!(Action::Push { force: false }.needs_stash());
    }
}
