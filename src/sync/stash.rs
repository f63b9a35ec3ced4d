//! Auto-stash around working-tree-altering operations
//!
//! A [`StashState`] is consumed by [`restore`], so a stash created for a run
//! can be popped at most once.

use chrono::Local;

use crate::error::{Error, Result};
use crate::git::Backend;

/// Whether this run created an auto-stash
#[must_use = "an auto-stash must be restored"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashState {
    None,
    Stashed { label: String },
}

impl StashState {
    pub fn is_stashed(&self) -> bool {
        matches!(self, StashState::Stashed { .. })
    }
}

/// Stash message for a run started now
pub fn label(prefix: &str) -> String {
    format!("{} {}", prefix, Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Stash tracked changes and untracked files, if there are any
pub async fn stash_if_dirty<B: Backend>(backend: &B, prefix: &str) -> Result<StashState> {
    let dirty = backend.working_tree_dirty().await?;
    let untracked = backend.untracked_files_exist().await?;
    if !dirty && !untracked {
        return Ok(StashState::None);
    }

    let label = label(prefix);
    tracing::info!(%label, dirty, untracked, "stashing local changes");

    let output = backend.stash_push(&label).await?;
    if !output.success {
        return Err(Error::StashFailed {
            message: output.message(),
        });
    }

    Ok(StashState::Stashed { label })
}

/// Pop the auto-stash, if one was created.
///
/// On failure the stash entry is left in place.
pub async fn restore<B: Backend>(backend: &B, state: StashState) -> Result<()> {
    let StashState::Stashed { label } = state else {
        return Ok(());
    };

    tracing::info!(%label, "restoring local changes");
    let result = match backend.stash_pop().await {
        Ok(output) if output.success => return Ok(()),
        Ok(output) => Err(Error::StashPopFailed {
            message: output.message(),
        }),
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        tracing::warn!(%label, error = %err, "auto-stash was not restored");
    }
    result
}
