use crate::config::Credentials;
use crate::error::{Result, ScmVersionError};
use crate::git::{ChangeKind, CommitId, CommitInfo, FileChange, RefEntry, Repository};
use git2::{
    BranchType, Cred, CredentialType, Delta, DiffFindOptions, FetchOptions, Oid, PushOptions,
    RemoteCallbacks, Repository as Git2Repo, Signature, Sort, StatusOptions,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Remote used for fetch and push
pub const REMOTE_NAME: &str = "origin";

/// Attempts per remote operation before authentication is given up
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    credentials: Credentials,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P, credentials: Credentials) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo, credentials })
    }

    fn commit_oid(&self, spec: &str) -> Result<Oid> {
        let object = self.repo.revparse_single(spec).map_err(|e| {
            ScmVersionError::scm(format!("Cannot find revision '{}': {}", spec, e))
        })?;
        Ok(object.peel_to_commit()?.id())
    }

    fn tag_commits(&self) -> Result<Vec<RefEntry>> {
        let names = self.repo.tag_names(None)?;
        let mut entries = Vec::new();

        for name in names.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{}", name))?;
            match reference.peel_to_commit() {
                Ok(commit) => entries.push(RefEntry {
                    name: name.to_string(),
                    commit: commit.id().to_string(),
                }),
                Err(e) => debug!("Tag {} does not point to a commit: {}", name, e),
            }
        }

        Ok(entries)
    }

    fn similarity(&self, old: Oid, new: Oid) -> u32 {
        if old == new {
            return 100;
        }
        match (self.repo.find_blob(old), self.repo.find_blob(new)) {
            (Ok(a), Ok(b)) => line_similarity(a.content(), b.content()),
            _ => 0,
        }
    }

    fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let credentials = &self.credentials;
        let mut attempts = 0;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("Authentication failed"));
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let (Some(user), Some(password)) = (&credentials.username, &credentials.password)
                {
                    return Cred::userpass_plaintext(user, password);
                }
            }

            let user = username_from_url
                .or(credentials.username.as_deref())
                .unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) {
                if let Some(key_file) = &credentials.key_file {
                    return Cred::ssh_key(user, None, key_file, credentials.passphrase.as_deref());
                }

                // Try SSH agent as fallback
                if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username(user);
            }

            Cred::default()
        });

        callbacks
    }

    fn fetch(&self, refspecs: &[&str]) -> Result<()> {
        if !self.credentials.is_configured() {
            info!("No credentials configured, remote {} is not fetched", REMOTE_NAME);
            return Ok(());
        }

        let mut remote = self.repo.find_remote(REMOTE_NAME).map_err(|e| {
            ScmVersionError::remote(format!("Remote '{}' not found: {}", REMOTE_NAME, e))
        })?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks());

        remote
            .fetch(refspecs, Some(&mut fetch_options), None)
            .map_err(|e| {
                ScmVersionError::remote(format!(
                    "Failed to fetch from remote '{}': {}",
                    REMOTE_NAME, e
                ))
            })?;

        debug!("Fetched {:?} from {}", refspecs, REMOTE_NAME);
        Ok(())
    }
}

impl Repository for Git2Repository {
    fn current_revision_id(&self) -> Result<CommitId> {
        let head = self.repo.head()?.peel_to_commit()?;
        Ok(head.id().to_string())
    }

    fn current_ref_name(&self) -> Result<String> {
        if self.repo.head_detached()? {
            return self.current_revision_id();
        }
        let head = self.repo.head()?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn head_tag(&self) -> Result<Option<String>> {
        let head = self.current_revision_id()?;
        let mut names: Vec<String> = self
            .tag_commits()?
            .into_iter()
            .filter(|entry| entry.commit == head)
            .map(|entry| entry.name)
            .collect();
        names.sort();
        Ok(names.pop())
    }

    fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        if statuses.is_empty() {
            return Ok(false);
        }

        info!("There are local changes on the repository.");
        for entry in statuses.iter() {
            debug!(
                "GIT: {} is {:?}",
                entry.path().unwrap_or("(non utf-8 path)"),
                entry.status()
            );
        }
        Ok(true)
    }

    fn list_tags(&self) -> Result<Vec<RefEntry>> {
        self.tag_commits()
    }

    fn list_branches(&self) -> Result<Vec<RefEntry>> {
        let mut entries: Vec<RefEntry> = Vec::new();

        for branch_type in [BranchType::Local, BranchType::Remote] {
            for branch in self.repo.branches(Some(branch_type))? {
                let (branch, _) = branch?;
                let Some(full_name) = branch.name()? else {
                    continue;
                };
                let name = match branch_type {
                    BranchType::Local => full_name,
                    BranchType::Remote => match full_name.split_once('/') {
                        Some((_, rest)) => rest,
                        None => continue,
                    },
                };
                if name == "HEAD" || entries.iter().any(|e| e.name == name) {
                    continue;
                }
                let Ok(commit) = branch.get().peel_to_commit() else {
                    continue;
                };
                entries.push(RefEntry {
                    name: name.to_string(),
                    commit: commit.id().to_string(),
                });
            }
        }

        Ok(entries)
    }

    fn resolve(&self, name: &str) -> Result<Option<CommitId>> {
        let candidates = [
            format!("refs/tags/{}", name),
            format!("refs/heads/{}", name),
            format!("refs/remotes/{}/{}", REMOTE_NAME, name),
        ];
        for candidate in candidates {
            if let Ok(reference) = self.repo.find_reference(&candidate) {
                return Ok(Some(reference.peel_to_commit()?.id().to_string()));
            }
        }

        match self.repo.revparse_single(name) {
            Ok(object) => Ok(Some(object.peel_to_commit()?.id().to_string())),
            Err(e) => {
                debug!("Cannot resolve '{}': {}", name, e);
                Ok(None)
            }
        }
    }

    fn walk_ancestry<'a>(
        &'a self,
        from: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<CommitId>> + 'a>> {
        let oid = self.commit_oid(from)?;
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL)?;
        revwalk.push(oid)?;

        Ok(Box::new(revwalk.map(|oid_result| {
            oid_result
                .map(|oid| oid.to_string())
                .map_err(ScmVersionError::from)
        })))
    }

    fn commits_between(&self, from: Option<&str>, to: &str) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(self.commit_oid(to)?)?;
        if let Some(from) = from {
            revwalk.hide(self.commit_oid(from)?)?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            commits.push(CommitInfo {
                id: oid.to_string(),
                message: commit.message().unwrap_or("(empty message)").to_string(),
            });
        }

        Ok(commits)
    }

    fn diff_against_first_parent(&self, commit: &str) -> Result<Vec<FileChange>> {
        let commit = self.repo.find_commit(self.commit_oid(commit)?)?;
        let new_tree = commit.tree()?;
        let old_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)?;
        let mut find_options = DiffFindOptions::new();
        find_options.renames(true).copies(true);
        diff.find_similar(Some(&mut find_options))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let old_path = delta
                .old_file()
                .path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let new_path = delta
                .new_file()
                .path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            let change = match delta.status() {
                Delta::Added => FileChange::new(new_path, ChangeKind::Added),
                Delta::Deleted => FileChange::new(old_path, ChangeKind::Deleted),
                Delta::Renamed => {
                    let score = self.similarity(delta.old_file().id(), delta.new_file().id());
                    FileChange::new(new_path, ChangeKind::Renamed { from: old_path, score })
                }
                Delta::Copied => {
                    let score = self.similarity(delta.old_file().id(), delta.new_file().id());
                    FileChange::new(new_path, ChangeKind::Copied { from: old_path, score })
                }
                _ => FileChange::new(new_path, ChangeKind::Modified),
            };
            changes.push(change);
        }

        Ok(changes)
    }

    fn create_tag(&self, name: &str, commit: &str, message: &str) -> Result<()> {
        let object = self.repo.find_object(self.commit_oid(commit)?, None)?;
        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now("scm-version", "scm-version@localhost"))?;

        self.repo
            .tag(name, &object, &signature, message, false)
            .map_err(|e| ScmVersionError::scm(format!("Cannot create tag '{}': {}", name, e)))?;

        Ok(())
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        let commit = self.repo.find_commit(self.commit_oid(start)?)?;

        self.repo
            .branch(name, &commit, false)
            .map_err(|e| ScmVersionError::scm(format!("Cannot create branch '{}': {}", name, e)))?;

        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<CommitId> {
        let id = self
            .resolve(name)?
            .ok_or_else(|| ScmVersionError::scm(format!("'{}' does not exist", name)))?;
        let oid = Oid::from_str(&id)?;
        let commit = self.repo.find_commit(oid)?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| ScmVersionError::scm(format!("Cannot check out '{}': {}", name, e)))?;
        self.repo.set_head_detached(oid)?;

        info!("Checked out {} at {}", name, id);
        Ok(id)
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .repo
            .find_reference(&format!("refs/tags/{}", name))
            .is_ok())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        if self.repo.find_branch(name, BranchType::Local).is_ok() {
            return Ok(true);
        }
        Ok(self
            .repo
            .find_branch(&format!("{}/{}", REMOTE_NAME, name), BranchType::Remote)
            .is_ok())
    }

    fn push(&self, names: &[String]) -> Result<()> {
        let mut remote = self.repo.find_remote(REMOTE_NAME).map_err(|e| {
            ScmVersionError::scm(format!("No remote named '{}' found: {}", REMOTE_NAME, e))
        })?;

        let mut refspecs = Vec::new();
        for name in names {
            let refspec = if self.tag_exists(name)? {
                format!("refs/tags/{0}:refs/tags/{0}", name)
            } else {
                format!("refs/heads/{0}:refs/heads/{0}", name)
            };
            refspecs.push(refspec);
        }

        let mut callbacks = self.remote_callbacks();
        // Add a push update reference callback to catch errors during push
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                warn!("Could not update reference {}: {}", refname, status);
                Err(git2::Error::from_str(&format!("Push failed for {}", refname)))
            } else {
                Ok(())
            }
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        remote
            .push(&refspecs, Some(&mut push_options))
            .map_err(|e| {
                if e.class() == git2::ErrorClass::Net {
                    ScmVersionError::scm(format!("Network error during push: {}", e))
                } else {
                    ScmVersionError::scm(format!("Failed to push {:?}: {}", names, e))
                }
            })?;

        info!("Pushed {:?} to {}", names, REMOTE_NAME);
        Ok(())
    }

    fn fetch_tags(&self) -> Result<()> {
        self.fetch(&["+refs/tags/*:refs/tags/*"])
    }

    fn fetch_all(&self) -> Result<()> {
        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", REMOTE_NAME);
        self.fetch(&[refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"])
    }

    fn remote_url(&self) -> Result<Option<String>> {
        match self.repo.find_remote(REMOTE_NAME) {
            Ok(remote) => Ok(remote.url().map(|url| url.to_string())),
            Err(_) => Ok(None),
        }
    }
}

/// Percentage of lines two blobs share, relative to their combined size
fn line_similarity(old: &[u8], new: &[u8]) -> u32 {
    let old_lines: Vec<&[u8]> = old.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
    let new_lines: Vec<&[u8]> = new.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
    let total = old_lines.len() + new_lines.len();
    if total == 0 {
        return 100;
    }

    let mut counts: HashMap<&[u8], usize> = HashMap::new();
    for line in &old_lines {
        *counts.entry(*line).or_insert(0) += 1;
    }
    let mut common = 0;
    for line in &new_lines {
        if let Some(count) = counts.get_mut(*line) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    (common * 200 / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Git2Repository::open(dir.path().join("missing"), Credentials::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_line_similarity() {
        assert_eq!(line_similarity(b"a\nb\n", b"a\nb\n"), 100);
        assert_eq!(line_similarity(b"a\nb\n", b"c\nd\n"), 0);
        assert_eq!(line_similarity(b"a\nb\nc\nd\n", b"a\nb\nc\ne\n"), 75);
        assert_eq!(line_similarity(b"", b""), 100);
    }
}
