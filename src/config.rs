//! Per-repository settings for gitsync
//!
//! Settings are read from an optional `.gitsync.yaml` at the root of the
//! working copy:
//!
//! ```yaml
//! remote: origin
//! rebase: false
//! stash_prefix: gitsync auto-stash
//! timeout_secs: 120
//! ```
//!
//! Command-line flags take precedence over the file. `force` is deliberately
//! absent: overwriting remote history is only ever enabled per invocation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Name of the settings file looked up in the working-copy root
pub const CONFIG_FILE: &str = ".gitsync.yaml";

/// Remote used when neither the CLI nor the config names one
pub const DEFAULT_REMOTE: &str = "origin";

/// Prefix of the auto-stash message
pub const DEFAULT_STASH_PREFIX: &str = "gitsync auto-stash";

/// Contents of `.gitsync.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Remote to sync against
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Prefer rebase over merge by default
    #[serde(default)]
    pub rebase: bool,
    /// Prefix for auto-stash messages
    #[serde(default = "default_stash_prefix")]
    pub stash_prefix: String,
    /// Deadline for a single git invocation, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

fn default_stash_prefix() -> String {
    DEFAULT_STASH_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            rebase: false,
            stash_prefix: default_stash_prefix(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load the config from a working-copy root, falling back to defaults
    pub fn load(workdir: &Path) -> Result<Self> {
        let path = workdir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self> {
        // An empty file deserializes to `null`
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| Error::Config {
            path,
            message: e.to_string(),
        })
    }

    /// Per-command deadline, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Immutable options for one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    /// Force-push when only the local side has new commits
    pub force: bool,
    /// Rebase instead of merge when the remote side has new commits
    pub rebase: bool,
    /// Plan only; perform no stash, push or pull
    pub dry_run: bool,
}
