//! Repository abstraction layer
//!
//! This module provides a trait-based abstraction over the version control
//! operations scm-version needs, allowing for multiple implementations.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [file::FileRepository]: A plain directory without version control
//! - [mock::MockRepository]: An in-memory repository for testing
//!
//! The backend is chosen once by [open_repository]; everything else works
//! against `&dyn Repository`.
//!
//! ```rust
//! # use scm_version::git::{MockRepository, Repository};
//! let repo = MockRepository::new();
//! let root = repo.commit("initial");
//! repo.tag("RELEASE_1.0.0", &root);
//! assert_eq!(repo.head_tag().unwrap().as_deref(), Some("RELEASE_1.0.0"));
//! ```

pub mod file;
pub mod mock;
pub mod repository;

pub use file::FileRepository;
pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::config::Credentials;
use crate::error::Result;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Full hexadecimal commit id
pub type CommitId = String;

/// A named ref (tag or branch) and the commit it points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub name: String,
    pub commit: CommitId,
}

/// Commit information for change logs
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// The full commit id
    pub id: CommitId,
    /// The full commit message
    pub message: String,
}

/// Kind of a file change between a commit and its first parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Copied { from: String, score: u32 },
    Renamed { from: String, score: u32 },
}

impl ChangeKind {
    /// One letter code: A, D, M, C or R
    pub fn code(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Modified => 'M',
            ChangeKind::Copied { .. } => 'C',
            ChangeKind::Renamed { .. } => 'R',
        }
    }
}

/// A file touched by a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        FileChange {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChangeKind::Copied { from, score } | ChangeKind::Renamed { from, score } => {
                write!(f, "{} -> {} ({})", from, self.path, score)
            }
            _ => write!(f, "{}", self.path),
        }
    }
}

/// Common repository operation trait
///
/// Read operations describe the working copy and its history; the handful
/// of mutations (tags, branches, checkout, remote sync) back the release
/// operations.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// backend errors to [crate::error::ScmVersionError] variants; remote
/// failures become `RemoteUnavailable`, failed pushes `ScmOperation`.
pub trait Repository {
    /// Full id of the HEAD commit
    fn current_revision_id(&self) -> Result<CommitId>;

    /// Current branch name, or the HEAD revision id when detached
    fn current_ref_name(&self) -> Result<String>;

    /// Name of a tag pointing at HEAD, if any
    fn head_tag(&self) -> Result<Option<String>>;

    /// True when the working tree has staged, unstaged or untracked changes
    fn is_dirty(&self) -> Result<bool>;

    fn list_tags(&self) -> Result<Vec<RefEntry>>;

    /// Local and remote branches, remote names without the remote prefix
    fn list_branches(&self) -> Result<Vec<RefEntry>>;

    /// Commit a tag, branch or revision id points to
    fn resolve(&self, name: &str) -> Result<Option<CommitId>>;

    /// Ancestors of `from` (inclusive) in topological order, children first
    fn walk_ancestry<'a>(
        &'a self,
        from: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<CommitId>> + 'a>>;

    /// Commits reachable from `to` but not from `from`, newest first
    fn commits_between(&self, from: Option<&str>, to: &str) -> Result<Vec<CommitInfo>>;

    /// Files changed by `commit` relative to its first parent
    fn diff_against_first_parent(&self, commit: &str) -> Result<Vec<FileChange>>;

    /// Creates an annotated tag
    fn create_tag(&self, name: &str, commit: &str, message: &str) -> Result<()>;

    fn create_branch(&self, name: &str, start: &str) -> Result<()>;

    /// Checks out a tag or branch with a detached HEAD and returns its commit
    fn checkout(&self, name: &str) -> Result<CommitId>;

    fn tag_exists(&self, name: &str) -> Result<bool>;

    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Pushes tag or branch names to the remote
    fn push(&self, names: &[String]) -> Result<()>;

    fn fetch_tags(&self) -> Result<()>;

    fn fetch_all(&self) -> Result<()>;

    /// URL of the `origin` remote
    fn remote_url(&self) -> Result<Option<String>>;
}

/// Opens the repository containing `path`, falling back to a plain
/// directory backend when `path` is not inside a git working copy.
pub fn open_repository(path: &Path, credentials: &Credentials) -> Box<dyn Repository> {
    match Git2Repository::open(path, credentials.clone()) {
        Ok(repo) => {
            info!("Using git repository at {}", path.display());
            Box::new(repo)
        }
        Err(e) => {
            warn!(
                "{} is not a git working copy ({}), versions are not SCM based",
                path.display(),
                e
            );
            Box::new(FileRepository::new(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_codes() {
        assert_eq!(ChangeKind::Added.code(), 'A');
        assert_eq!(ChangeKind::Deleted.code(), 'D');
        assert_eq!(ChangeKind::Modified.code(), 'M');
        let renamed = ChangeKind::Renamed {
            from: "a".to_string(),
            score: 90,
        };
        assert_eq!(renamed.code(), 'R');
    }

    #[test]
    fn test_file_change_display() {
        let added = FileChange::new("x.txt", ChangeKind::Added);
        assert_eq!(added.to_string(), "x.txt");

        let renamed = FileChange::new(
            "b.txt",
            ChangeKind::Renamed {
                from: "a.txt".to_string(),
                score: 90,
            },
        );
        assert_eq!(renamed.to_string(), "a.txt -> b.txt (90)");
    }
}
