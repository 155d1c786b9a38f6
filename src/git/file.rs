use crate::error::Result;
use crate::git::{CommitId, CommitInfo, FileChange, RefEntry, Repository};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Revision reported for directories without version control
pub const UNKNOWN_REVISION: &str = "unknown";

/// Ref name reported for directories without version control
pub const FILE_REF_NAME: &str = "trunk";

/// Backend for a plain directory without version control.
///
/// It always reports a modified trunk so resolution falls through to the
/// default version. History queries are empty and mutations are logged and
/// otherwise ignored.
pub struct FileRepository {
    path: PathBuf,
}

impl FileRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileRepository {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn ignored(&self, operation: &str) {
        warn!(
            "{} is not supported for {} without version control",
            operation,
            self.path.display()
        );
    }
}

impl Repository for FileRepository {
    fn current_revision_id(&self) -> Result<CommitId> {
        Ok(UNKNOWN_REVISION.to_string())
    }

    fn current_ref_name(&self) -> Result<String> {
        Ok(FILE_REF_NAME.to_string())
    }

    fn head_tag(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(true)
    }

    fn list_tags(&self) -> Result<Vec<RefEntry>> {
        Ok(Vec::new())
    }

    fn list_branches(&self) -> Result<Vec<RefEntry>> {
        Ok(Vec::new())
    }

    fn resolve(&self, _name: &str) -> Result<Option<CommitId>> {
        Ok(None)
    }

    fn walk_ancestry<'a>(
        &'a self,
        _from: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<CommitId>> + 'a>> {
        warn!("There is no history for {}", self.path.display());
        Ok(Box::new(std::iter::empty()))
    }

    fn commits_between(&self, _from: Option<&str>, _to: &str) -> Result<Vec<CommitInfo>> {
        warn!("There is no history for {}", self.path.display());
        Ok(Vec::new())
    }

    fn diff_against_first_parent(&self, _commit: &str) -> Result<Vec<FileChange>> {
        Ok(Vec::new())
    }

    fn create_tag(&self, _name: &str, _commit: &str, _message: &str) -> Result<()> {
        self.ignored("Tag creation");
        Ok(())
    }

    fn create_branch(&self, _name: &str, _start: &str) -> Result<()> {
        self.ignored("Branch creation");
        Ok(())
    }

    fn checkout(&self, _name: &str) -> Result<CommitId> {
        self.ignored("Checkout");
        Ok(UNKNOWN_REVISION.to_string())
    }

    fn tag_exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn branch_exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn push(&self, _names: &[String]) -> Result<()> {
        self.ignored("Push");
        Ok(())
    }

    fn fetch_tags(&self) -> Result<()> {
        Ok(())
    }

    fn fetch_all(&self) -> Result<()> {
        Ok(())
    }

    fn remote_url(&self) -> Result<Option<String>> {
        let path = self.path.canonicalize().unwrap_or_else(|_| self.path.clone());
        Ok(Some(format!("file://{}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_modified_trunk() {
        let repo = FileRepository::new(".");
        assert_eq!(repo.current_revision_id().unwrap(), "unknown");
        assert_eq!(repo.current_ref_name().unwrap(), "trunk");
        assert!(repo.is_dirty().unwrap());
        assert!(repo.list_tags().unwrap().is_empty());
    }

    #[test]
    fn test_remote_url_is_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path());
        let url = repo.remote_url().unwrap().unwrap();
        assert!(url.starts_with("file://"));
    }

    #[test]
    fn test_mutations_are_ignored() {
        let repo = FileRepository::new(".");
        repo.create_tag("RELEASE_1.0.0", "unknown", "msg").unwrap();
        repo.create_branch("SB_1.0", "unknown").unwrap();
        assert!(!repo.tag_exists("RELEASE_1.0.0").unwrap());
        assert!(!repo.branch_exists("SB_1.0").unwrap());
        assert_eq!(repo.checkout("RELEASE_1.0.0").unwrap(), UNKNOWN_REVISION);
        repo.push(&["RELEASE_1.0.0".to_string()]).unwrap();
    }
}
