//! gitsync - keep a branch in step with its remote
//!
//! One run fetches the remote, works out how local and remote history
//! relate, and applies the matching reconciliation while keeping
//! uncommitted work safe.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        git-sync CLI                          │
//! │        (flags, .gitsync.yaml, logging, exit codes)           │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ SyncOptions
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Synchronizer                          │
//! │   fetch ─▶ classify ─▶ stash ─▶ push/pull/merge/rebase       │
//! │                                   ─▶ restore stash (once)    │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ Backend trait
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       GitRepository                          │
//! │   libgit2: branch, refs, commit counts, status               │
//! │   git CLI: fetch, push, pull, stash                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Local vs remote        | Action                                   |
//! |------------------------|------------------------------------------|
//! | no remote branch       | push with upstream tracking              |
//! | equal                  | nothing                                  |
//! | ahead                  | push (`--force` with `-f`)               |
//! | behind                 | pull (merge, or rebase with `-r`)        |
//! | diverged               | pull (merge or rebase), then push        |

pub mod config;
pub mod error;
pub mod git;
pub mod sync;

pub use config::{Config, SyncOptions};
pub use error::{Error, Result};
pub use git::{Backend, GitRepository};
pub use sync::{Action, Divergence, Outcome, SyncReport, Synchronizer};
