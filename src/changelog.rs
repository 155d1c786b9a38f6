//! AsciiDoc change log between a previous release and HEAD

use crate::domain::{NamingConfig, SemanticVersion};
use crate::error::{Result, ScmVersionError};
use crate::git::{CommitId, Repository};
use crate::previous::PreviousVersionIndex;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub use crate::git::{ChangeKind, FileChange};

/// Baseline shown when the log starts at the root commit
pub const FIRST_COMMIT: &str = "first commit";

const SHORT_ID_LEN: usize = 8;

/// One commit with the files it changed
#[derive(Debug, Clone, PartialEq)]
pub struct CommitChanges {
    pub message: String,
    pub short_id: String,
    pub files: Vec<FileChange>,
}

/// Rendered content of a change log
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub target_version: String,
    pub baseline: String,
    pub created: DateTime<Utc>,
    pub commits: Vec<CommitChanges>,
}

impl ChangeRecord {
    pub fn render(&self) -> String {
        let mut out = format!(
            "\n= Change Log for {}\n\nThis list contains changes since {}. +\nCreated: {}\n\n",
            self.target_version,
            self.baseline,
            self.created.format("%a %b %d %H:%M:%S UTC %Y")
        );
        out.push_str("[cols=\"5%,5%,90%\", width=\"95%\", options=\"header\"]\n|===\n");

        for commit in &self.commits {
            out.push_str(&format!("3+| {} ({}) \n", commit.message, commit.short_id));
            for file in &commit.files {
                out.push_str(&format!("| | {} | {} \n", file.kind.code(), file));
            }
        }

        out.push_str("|===\n");
        out
    }

    /// Recreates `path` and writes the rendered log into it
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if path.exists() {
            fs::remove_file(path)?;
        }
        fs::write(path, self.render())?;
        info!("Change log written to {}", path.display());
        Ok(())
    }
}

/// Reads commit messages and file changes from a repository
pub struct ChangeHistoryExtractor<'a> {
    repo: &'a dyn Repository,
}

impl<'a> ChangeHistoryExtractor<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        ChangeHistoryExtractor { repo }
    }

    /// Root commit reached by walking the history of `head`, or `None`
    /// when there is no history
    pub fn first_commit(&self, head: &str) -> Result<Option<CommitId>> {
        let mut root = None;
        for id in self.repo.walk_ancestry(head)? {
            root = Some(id?);
        }
        Ok(root)
    }

    /// Collects the commits in `(from, to]`, starting at the root commit when
    /// `from` is absent. Any failure is reported as a changelog error.
    pub fn generate(
        &self,
        from: Option<&str>,
        to: &str,
        target_version: &str,
        baseline: &str,
    ) -> Result<ChangeRecord> {
        self.collect(from, to)
            .map(|commits| ChangeRecord {
                target_version: target_version.to_string(),
                baseline: baseline.to_string(),
                created: Utc::now(),
                commits,
            })
            .map_err(ScmVersionError::changelog)
    }

    fn collect(&self, from: Option<&str>, to: &str) -> Result<Vec<CommitChanges>> {
        let from = match from {
            Some(from) => from.to_string(),
            None => match self.first_commit(to)? {
                Some(root) => root,
                None => {
                    warn!("No commits found from '{}', the change log is empty", to);
                    return Ok(Vec::new());
                }
            },
        };
        debug!("Change log from {} to {}", from, to);

        self.repo
            .commits_between(Some(&from), to)?
            .into_iter()
            .map(|commit| {
                let files = self.repo.diff_against_first_parent(&commit.id)?;
                Ok(CommitChanges {
                    message: commit.message.trim().to_string(),
                    short_id: commit.id.chars().take(SHORT_ID_LEN).collect(),
                    files,
                })
            })
            .collect()
    }
}

/// Builds the change log of HEAD against the previous release.
///
/// `requested_previous` selects the previous release explicitly; a missing
/// release is then an error. Without it the highest release below
/// `pre_version` is used, or the root commit when there is none.
pub fn change_record(
    repo: &dyn Repository,
    naming: &NamingConfig,
    pre_version: &SemanticVersion,
    use_build_extension: bool,
    requested_previous: Option<&str>,
) -> Result<ChangeRecord> {
    let head = repo.current_revision_id()?;
    let index = PreviousVersionIndex::build(repo, naming, pre_version, use_build_extension)?;
    let extractor = ChangeHistoryExtractor::new(repo);
    let target = pre_version.to_string();

    let requested = requested_previous.filter(|s| !s.trim().is_empty());
    let previous = match index.previous_version_tag(requested) {
        Ok(tag) => Some(tag.clone()),
        Err(e) if requested.is_some() => return Err(e),
        Err(_) => None,
    };

    match previous {
        Some(tag) => {
            info!("Change log of {} since {}", target, tag.reference.name);
            extractor.generate(
                Some(&tag.reference.commit),
                &head,
                &target,
                &tag.version.to_string(),
            )
        }
        None => {
            info!("No previous version for {}, change log starts at the first commit", target);
            extractor.generate(None, &head, &target, FIRST_COMMIT)
        }
    }
}
