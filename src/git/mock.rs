use crate::error::{Result, ScmVersionError};
use crate::git::{CommitId, CommitInfo, FileChange, RefEntry, Repository};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
struct MockCommit {
    id: CommitId,
    parents: Vec<CommitId>,
    message: String,
    changes: Vec<FileChange>,
}

#[derive(Debug, Clone)]
enum Head {
    Branch(String),
    Detached(CommitId),
}

#[derive(Debug)]
struct MockState {
    /// Commits in creation order; parents always precede their children
    commits: Vec<MockCommit>,
    tags: BTreeMap<String, (CommitId, String)>,
    branches: BTreeMap<String, CommitId>,
    head: Head,
    dirty: bool,
    remote: Option<String>,
    pushed: Vec<String>,
    /// `tags` or `all` per fetch request
    fetched: Vec<&'static str>,
    fetch_error: Option<String>,
}

/// In-memory repository for testing without actual git operations
///
/// Commits get deterministic 40 character ids. New commits advance the
/// checked out branch, or move a detached HEAD.
pub struct MockRepository {
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create an empty repository with `master` checked out
    pub fn new() -> Self {
        MockRepository {
            state: RefCell::new(MockState {
                commits: Vec::new(),
                tags: BTreeMap::new(),
                branches: BTreeMap::new(),
                head: Head::Branch("master".to_string()),
                dirty: false,
                remote: None,
                pushed: Vec::new(),
                fetched: Vec::new(),
                fetch_error: None,
            }),
        }
    }

    /// Add a commit on top of HEAD
    pub fn commit(&self, message: &str) -> CommitId {
        self.commit_with_changes(message, Vec::new())
    }

    /// Add a commit touching `changes` on top of HEAD
    pub fn commit_with_changes(&self, message: &str, changes: Vec<FileChange>) -> CommitId {
        let mut state = self.state.borrow_mut();
        let id = mock_id(state.commits.len() as u32 + 1);
        let parent = head_commit(&state);

        state.commits.push(MockCommit {
            id: id.clone(),
            parents: parent.into_iter().collect(),
            message: message.to_string(),
            changes,
        });

        match state.head.clone() {
            Head::Branch(name) => {
                state.branches.insert(name, id.clone());
            }
            Head::Detached(_) => state.head = Head::Detached(id.clone()),
        }

        id
    }

    /// Add a merge commit of HEAD and `other`
    pub fn merge(&self, message: &str, other: &str) -> CommitId {
        let id = self.commit(message);
        let mut state = self.state.borrow_mut();
        if let Some(commit) = state.commits.iter_mut().find(|c| c.id == id) {
            commit.parents.push(other.to_string());
        }
        id
    }

    /// Create a branch at `commit` without checking it out
    pub fn create_branch_at(&self, name: &str, commit: &str) {
        self.state
            .borrow_mut()
            .branches
            .insert(name.to_string(), commit.to_string());
    }

    /// Check out a branch, creating it at HEAD when missing
    pub fn checkout_branch(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if !state.branches.contains_key(name) {
            if let Some(head) = head_commit(&state) {
                state.branches.insert(name.to_string(), head);
            }
        }
        state.head = Head::Branch(name.to_string());
    }

    /// Detach HEAD at `commit`
    pub fn detach(&self, commit: &str) {
        self.state.borrow_mut().head = Head::Detached(commit.to_string());
    }

    /// Add a tag pointing at `commit`
    pub fn tag(&self, name: &str, commit: &str) {
        self.state
            .borrow_mut()
            .tags
            .insert(name.to_string(), (commit.to_string(), String::new()));
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state.borrow_mut().dirty = dirty;
    }

    pub fn set_remote(&self, url: &str) {
        self.state.borrow_mut().remote = Some(url.to_string());
    }

    /// Make every fetch fail with `reason`
    pub fn fail_fetch(&self, reason: &str) {
        self.state.borrow_mut().fetch_error = Some(reason.to_string());
    }

    /// Fetch requests so far, `tags` or `all`
    pub fn fetched(&self) -> Vec<&'static str> {
        self.state.borrow().fetched.clone()
    }

    /// Names pushed so far
    pub fn pushed(&self) -> Vec<String> {
        self.state.borrow().pushed.clone()
    }

    /// Message of an annotated tag
    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.state.borrow().tags.get(name).map(|(_, m)| m.clone())
    }

    fn fetch(&self, what: &'static str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.fetched.push(what);
        match &state.fetch_error {
            Some(reason) => Err(ScmVersionError::remote(reason.clone())),
            None => Ok(()),
        }
    }

    fn reachable(state: &MockState, from: &str) -> HashSet<CommitId> {
        let mut seen = HashSet::new();
        let mut pending = vec![from.to_string()];
        while let Some(id) = pending.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(commit) = state.commits.iter().find(|c| c.id == id) {
                pending.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    fn resolve_in(state: &MockState, name: &str) -> Option<CommitId> {
        if let Some((commit, _)) = state.tags.get(name) {
            return Some(commit.clone());
        }
        if let Some(commit) = state.branches.get(name) {
            return Some(commit.clone());
        }
        state
            .commits
            .iter()
            .find(|c| c.id == name)
            .map(|c| c.id.clone())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn mock_id(n: u32) -> CommitId {
    format!("{:08x}", n.wrapping_mul(0x9e37_79b1)).repeat(5)
}

fn head_commit(state: &MockState) -> Option<CommitId> {
    match &state.head {
        Head::Branch(name) => state.branches.get(name).cloned(),
        Head::Detached(id) => Some(id.clone()),
    }
}

impl Repository for MockRepository {
    fn current_revision_id(&self) -> Result<CommitId> {
        head_commit(&self.state.borrow())
            .ok_or_else(|| ScmVersionError::scm("HEAD does not point to a commit"))
    }

    fn current_ref_name(&self) -> Result<String> {
        match &self.state.borrow().head {
            Head::Branch(name) => Ok(name.clone()),
            Head::Detached(id) => Ok(id.clone()),
        }
    }

    fn head_tag(&self) -> Result<Option<String>> {
        let state = self.state.borrow();
        let Some(head) = head_commit(&state) else {
            return Ok(None);
        };
        Ok(state
            .tags
            .iter()
            .filter(|(_, (commit, _))| *commit == head)
            .map(|(name, _)| name.clone())
            .last())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(self.state.borrow().dirty)
    }

    fn list_tags(&self) -> Result<Vec<RefEntry>> {
        Ok(self
            .state
            .borrow()
            .tags
            .iter()
            .map(|(name, (commit, _))| RefEntry {
                name: name.clone(),
                commit: commit.clone(),
            })
            .collect())
    }

    fn list_branches(&self) -> Result<Vec<RefEntry>> {
        Ok(self
            .state
            .borrow()
            .branches
            .iter()
            .map(|(name, commit)| RefEntry {
                name: name.clone(),
                commit: commit.clone(),
            })
            .collect())
    }

    fn resolve(&self, name: &str) -> Result<Option<CommitId>> {
        Ok(Self::resolve_in(&self.state.borrow(), name))
    }

    fn walk_ancestry<'a>(
        &'a self,
        from: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<CommitId>> + 'a>> {
        let state = self.state.borrow();
        let start = Self::resolve_in(&state, from)
            .ok_or_else(|| ScmVersionError::scm(format!("Cannot find revision '{}'", from)))?;
        let reachable = Self::reachable(&state, &start);

        let ordered: Vec<Result<CommitId>> = state
            .commits
            .iter()
            .rev()
            .filter(|c| reachable.contains(&c.id))
            .map(|c| Ok(c.id.clone()))
            .collect();

        Ok(Box::new(ordered.into_iter()))
    }

    fn commits_between(&self, from: Option<&str>, to: &str) -> Result<Vec<CommitInfo>> {
        let state = self.state.borrow();
        let to = Self::resolve_in(&state, to)
            .ok_or_else(|| ScmVersionError::scm(format!("Cannot find revision '{}'", to)))?;
        let included = Self::reachable(&state, &to);
        let excluded = match from {
            Some(from) => {
                let from = Self::resolve_in(&state, from).ok_or_else(|| {
                    ScmVersionError::scm(format!("Cannot find revision '{}'", from))
                })?;
                Self::reachable(&state, &from)
            }
            None => HashSet::new(),
        };

        Ok(state
            .commits
            .iter()
            .rev()
            .filter(|c| included.contains(&c.id) && !excluded.contains(&c.id))
            .map(|c| CommitInfo {
                id: c.id.clone(),
                message: c.message.clone(),
            })
            .collect())
    }

    fn diff_against_first_parent(&self, commit: &str) -> Result<Vec<FileChange>> {
        let state = self.state.borrow();
        state
            .commits
            .iter()
            .find(|c| c.id == commit)
            .map(|c| c.changes.clone())
            .ok_or_else(|| ScmVersionError::scm(format!("Cannot find commit '{}'", commit)))
    }

    fn create_tag(&self, name: &str, commit: &str, message: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.tags.contains_key(name) {
            return Err(ScmVersionError::scm(format!("Tag '{}' already exists", name)));
        }
        let commit = Self::resolve_in(&state, commit)
            .ok_or_else(|| ScmVersionError::scm(format!("Cannot find revision '{}'", commit)))?;
        state
            .tags
            .insert(name.to_string(), (commit, message.to_string()));
        Ok(())
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(ScmVersionError::scm(format!(
                "Branch '{}' already exists",
                name
            )));
        }
        let commit = Self::resolve_in(&state, start)
            .ok_or_else(|| ScmVersionError::scm(format!("Cannot find revision '{}'", start)))?;
        state.branches.insert(name.to_string(), commit);
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<CommitId> {
        let mut state = self.state.borrow_mut();
        let commit = Self::resolve_in(&state, name)
            .ok_or_else(|| ScmVersionError::scm(format!("'{}' does not exist", name)))?;
        state.head = Head::Detached(commit.clone());
        Ok(commit)
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().tags.contains_key(name))
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().branches.contains_key(name))
    }

    fn push(&self, names: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.remote.is_none() {
            return Err(ScmVersionError::scm("No remote named 'origin' found"));
        }
        state.pushed.extend(names.iter().cloned());
        Ok(())
    }

    fn fetch_tags(&self) -> Result<()> {
        self.fetch("tags")
    }

    fn fetch_all(&self) -> Result<()> {
        self.fetch("all")
    }

    fn remote_url(&self) -> Result<Option<String>> {
        Ok(self.state.borrow().remote.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commits_advance_branch() {
        let repo = MockRepository::new();
        let first = repo.commit("first");
        let second = repo.commit("second");

        assert_ne!(first, second);
        assert_eq!(first.len(), 40);
        assert_eq!(repo.current_revision_id().unwrap(), second);
        assert_eq!(repo.current_ref_name().unwrap(), "master");
        assert_eq!(repo.resolve("master").unwrap(), Some(second));
    }

    #[test]
    fn test_walk_is_children_first() {
        let repo = MockRepository::new();
        let a = repo.commit("a");
        let b = repo.commit("b");
        repo.checkout_branch("FB_x");
        let c = repo.commit("c");

        let walk: Vec<CommitId> = repo
            .walk_ancestry(&c)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(walk, vec![c, b, a]);
    }

    #[test]
    fn test_detached_head() {
        let repo = MockRepository::new();
        let a = repo.commit("a");
        repo.commit("b");
        repo.detach(&a);

        assert_eq!(repo.current_ref_name().unwrap(), a);
        assert_eq!(repo.current_revision_id().unwrap(), a);
    }

    #[test]
    fn test_commits_between_excludes_ancestors() {
        let repo = MockRepository::new();
        let a = repo.commit("a");
        let b = repo.commit("b");
        let c = repo.commit("c");

        let commits = repo.commits_between(Some(&a), &c).unwrap();
        let ids: Vec<_> = commits.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c, b]);
    }

    #[test]
    fn test_head_tag_and_existing_tag() {
        let repo = MockRepository::new();
        let a = repo.commit("a");
        repo.tag("RELEASE_1.0.0", &a);

        assert_eq!(repo.head_tag().unwrap().as_deref(), Some("RELEASE_1.0.0"));
        assert!(repo.create_tag("RELEASE_1.0.0", &a, "again").is_err());
    }

    #[test]
    fn test_push_requires_remote() {
        let repo = MockRepository::new();
        assert!(repo.push(&["SB_1.0".to_string()]).is_err());

        repo.set_remote("https://example.com/repo.git");
        repo.push(&["SB_1.0".to_string()]).unwrap();
        assert_eq!(repo.pushed(), vec!["SB_1.0".to_string()]);
    }
}
