//! [`Backend`] implementation for a real working copy

use git2::{ErrorCode, Repository as Git2Repo, Status, StatusOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Backend, GitCommand, GitOutput, PullMode, StatusCode, StatusEntry};
use crate::error::{Error, Result};

/// A git working copy, queried through libgit2 and driven through `git`
pub struct GitRepository {
    inner: Git2Repo,
    git: GitCommand,
}

impl GitRepository {
    /// Find the repository containing `path`
    pub fn discover(path: &Path) -> Result<Self> {
        let inner = Git2Repo::discover(path).map_err(|_| Error::NotARepository {
            path: Some(path.to_path_buf()),
        })?;

        // Bare repositories have no workdir; run git from the git dir so the
        // working-copy check can report them cleanly.
        let root: PathBuf = inner
            .workdir()
            .unwrap_or_else(|| inner.path())
            .to_path_buf();

        Ok(Self {
            inner,
            git: GitCommand::new(root),
        })
    }

    /// Per-command deadline for git invocations
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.git = self.git.with_timeout(timeout);
        self
    }

    /// Root of the working copy, if any
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the underlying git2 repository
    pub fn inner(&self) -> &Git2Repo {
        &self.inner
    }

    fn statuses(&self, include_untracked: bool) -> Result<git2::Statuses<'_>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false)
            .exclude_submodules(true);
        Ok(self.inner.statuses(Some(&mut opts))?)
    }

    /// Porcelain codes of every conflicted path in the index
    fn conflict_codes(&self) -> Result<HashMap<String, StatusCode>> {
        let mut index = self.inner.index()?;
        // Pick up index changes made by the git executable
        index.read(false)?;

        let mut codes = HashMap::new();
        if !index.has_conflicts() {
            return Ok(codes);
        }

        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let path = [&conflict.our, &conflict.their, &conflict.ancestor]
                .into_iter()
                .flatten()
                .next()
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned());

            if let Some(path) = path {
                let code = StatusCode::from_conflict_stages(
                    conflict.ancestor.is_some(),
                    conflict.our.is_some(),
                    conflict.their.is_some(),
                );
                codes.insert(path, code);
            }
        }

        Ok(codes)
    }
}

/// Porcelain code for a non-conflicted status entry
fn status_code(status: Status) -> StatusCode {
    if status.contains(Status::WT_NEW) && !status.intersects(Status::INDEX_NEW) {
        return StatusCode::UNTRACKED;
    }

    let index = if status.contains(Status::INDEX_NEW) {
        'A'
    } else if status.contains(Status::INDEX_MODIFIED) {
        'M'
    } else if status.contains(Status::INDEX_DELETED) {
        'D'
    } else if status.contains(Status::INDEX_RENAMED) {
        'R'
    } else if status.contains(Status::INDEX_TYPECHANGE) {
        'T'
    } else {
        ' '
    };

    let worktree = if status.contains(Status::WT_MODIFIED) {
        'M'
    } else if status.contains(Status::WT_DELETED) {
        'D'
    } else if status.contains(Status::WT_RENAMED) {
        'R'
    } else if status.contains(Status::WT_TYPECHANGE) {
        'T'
    } else {
        ' '
    };

    StatusCode::new(index, worktree)
}

impl Backend for GitRepository {
    async fn is_repository(&self) -> Result<bool> {
        Ok(!self.inner.is_bare() && self.inner.workdir().is_some())
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.git.workdir().to_path_buf())
    }

    async fn current_branch(&self) -> Result<String> {
        match self.inner.head() {
            Ok(head) => {
                if self.inner.head_detached()? || !head.is_branch() {
                    return Err(Error::DetachedHead);
                }
                head.shorthand()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Other("Branch name is not valid UTF-8".to_string()))
            }
            // A fresh repository: HEAD names a branch with no commits yet
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.inner.find_reference("HEAD")?;
                head.symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or(Error::DetachedHead)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(&self, remote: &str) -> Result<GitOutput> {
        self.git.run(&["fetch", remote]).await
    }

    async fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let name = format!("refs/remotes/{}/{}", remote, branch);
        match self.inner.find_reference(&name) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn count_commits(&self, range: &str) -> Result<usize> {
        let mut walk = self.inner.revwalk()?;
        walk.push_range(range)?;

        let mut count = 0;
        for oid in walk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    async fn push(
        &self,
        remote: &str,
        branch: &str,
        set_upstream: bool,
        force: bool,
    ) -> Result<GitOutput> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("--set-upstream");
        }
        if force {
            args.push("--force");
        }
        args.extend([remote, branch]);
        self.git.run(&args).await
    }

    async fn pull(
        &self,
        remote: &str,
        branch: &str,
        mode: PullMode,
        no_edit: bool,
    ) -> Result<GitOutput> {
        // Always explicit: newer git refuses a divergent pull without a mode
        let mut args = vec![
            "pull",
            match mode {
                PullMode::Merge => "--no-rebase",
                PullMode::Rebase => "--rebase",
            },
        ];
        if no_edit {
            args.push("--no-edit");
        }
        args.extend([remote, branch]);
        self.git.run(&args).await
    }

    async fn working_tree_dirty(&self) -> Result<bool> {
        let statuses = self.statuses(false)?;
        Ok(statuses
            .iter()
            .any(|entry| !entry.status().is_ignored() && entry.status() != Status::CURRENT))
    }

    async fn untracked_files_exist(&self) -> Result<bool> {
        let statuses = self.statuses(true)?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status().contains(Status::WT_NEW)))
    }

    async fn stash_push(&self, label: &str) -> Result<GitOutput> {
        let staged = self.git.run(&["add", "--all"]).await?;
        if !staged.success {
            return Ok(staged);
        }
        self.git.run(&["stash", "push", "--message", label]).await
    }

    async fn stash_pop(&self) -> Result<GitOutput> {
        self.git.run(&["stash", "pop"]).await
    }

    async fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let conflicts = self.conflict_codes()?;
        let statuses = self.statuses(true)?;

        let mut entries = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                continue;
            };

            let code = if entry.status().is_conflicted() {
                conflicts
                    .get(path)
                    .copied()
                    .unwrap_or(StatusCode::BOTH_MODIFIED)
            } else {
                status_code(entry.status())
            };
            entries.push(StatusEntry::new(code, path));
        }

        Ok(entries)
    }
}
