//! Porcelain status codes
//!
//! Entries use the two-letter `XY` codes of `git status --porcelain`: `X` is
//! the index side, `Y` the working tree. Unmerged paths are the seven pairs
//! listed in `git-status(1)`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Two-letter porcelain status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode {
    pub index: char,
    pub worktree: char,
}

impl StatusCode {
    pub const BOTH_MODIFIED: Self = Self::new('U', 'U');
    pub const BOTH_ADDED: Self = Self::new('A', 'A');
    pub const BOTH_DELETED: Self = Self::new('D', 'D');
    pub const UNTRACKED: Self = Self::new('?', '?');

    pub const fn new(index: char, worktree: char) -> Self {
        Self { index, worktree }
    }

    /// Code of a conflicted path, from which stages the index holds for it
    pub fn from_conflict_stages(ancestor: bool, ours: bool, theirs: bool) -> Self {
        match (ancestor, ours, theirs) {
            (true, true, true) => Self::BOTH_MODIFIED,
            (false, true, true) => Self::BOTH_ADDED,
            (true, false, false) => Self::BOTH_DELETED,
            (true, true, false) => Self::new('U', 'D'),
            (true, false, true) => Self::new('D', 'U'),
            (false, true, false) => Self::new('A', 'U'),
            (false, false, true) => Self::new('U', 'A'),
            // An index entry with no stages is not a conflict
            (false, false, false) => Self::new(' ', ' '),
        }
    }

    /// True for paths left with conflict markers by a merge
    pub fn is_unmerged(&self) -> bool {
        matches!(
            (self.index, self.worktree),
            ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
        )
    }

    pub fn is_untracked(&self) -> bool {
        *self == Self::UNTRACKED
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.index, self.worktree)
    }
}

impl FromStr for StatusCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(index), Some(worktree), None) => Ok(Self::new(index, worktree)),
            _ => Err(Error::Other(format!("Invalid status code '{}'", s))),
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One path in the working-tree status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub code: StatusCode,
    pub path: String,
}

impl StatusEntry {
    pub fn new(code: StatusCode, path: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
        }
    }
}
