//! Tag, branch and checkout operations driven by the resolved version

use crate::config::VersionSettings;
use crate::domain::{BranchKind, NamingConfig, SemanticVersion};
use crate::error::{Result, ScmVersionError};
use crate::filter::{FeatureSuffix, VersionFilter};
use crate::git::{CommitId, Repository};
use crate::previous;
use crate::resolver::Resolution;
use tracing::{debug, info, warn};

/// Release operations on one repository
///
/// In dry-run mode nothing is written; every mutation is only logged and
/// the names it would have created are returned.
pub struct ReleaseManager<'a> {
    repo: &'a dyn Repository,
    naming: &'a NamingConfig,
    settings: &'a VersionSettings,
    dry_run: bool,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        naming: &'a NamingConfig,
        settings: &'a VersionSettings,
        dry_run: bool,
    ) -> Self {
        ReleaseManager {
            repo,
            naming,
            settings,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Creates the release tag of the pre-version at `rev` or HEAD and
    /// returns its name
    pub fn create_tag(&self, resolution: &Resolution, rev: Option<&str>) -> Result<String> {
        if resolution.branch.kind == BranchKind::Tag {
            return Err(ScmVersionError::scm(format!(
                "Cannot create a tag from tag '{}'",
                resolution.branch.name
            )));
        }

        let version = resolution.pre_version.to_string();
        let name = self.naming.ref_name(BranchKind::Tag, &version);
        if self.repo.tag_exists(&name)? {
            return Err(ScmVersionError::scm(format!(
                "Tag for {} exists on this repo",
                version
            )));
        }

        let target = rev.unwrap_or(resolution.revision_id.as_str());
        if self.dry_run {
            info!("DryRun: tag {} will be created on {}", name, target);
            return Ok(name);
        }

        let commit = self.repo.resolve(target)?.ok_or_else(|| {
            ScmVersionError::scm(format!("Revision '{}' does not exist", target))
        })?;
        self.repo.create_tag(
            &name,
            &commit,
            &format!("Tag {} created by scm-version", name),
        )?;
        info!("Tag {} was created on {}", name, resolution.branch.name);

        self.push(&name)?;
        Ok(name)
    }

    /// Creates a stabilization branch for the pre-version, or a feature
    /// branch when `feature` is given, and returns its name
    pub fn create_branch(&self, resolution: &Resolution, feature: Option<&str>) -> Result<String> {
        if resolution.branch.kind == BranchKind::Tag {
            return Err(ScmVersionError::scm(
                "It is not possible to create a branch from a tag",
            ));
        }

        let feature = feature.map(str::trim).filter(|f| !f.is_empty());
        let (kind, version) = match feature {
            Some(feature) => (
                BranchKind::Feature,
                resolution.pre_version.with_branch_metadata(feature),
            ),
            None => (BranchKind::Stabilization, resolution.pre_version.clone()),
        };

        let name = self
            .naming
            .ref_name(kind, &version.to_string_for(self.settings.pattern_digits));
        if self.repo.branch_exists(&name)? {
            return Err(ScmVersionError::scm(format!(
                "Branch {} exists in this repo",
                name
            )));
        }

        if self.dry_run {
            info!("DryRun: branch {} will be created", name);
            return Ok(name);
        }

        self.repo.create_branch(&name, &resolution.revision_id)?;
        info!("Branch {} was created", name);

        self.push(&name)?;
        Ok(name)
    }

    /// Checks out the release tag of `version`, or the branch of `kind`
    /// carrying it. Returns the commit id of the detached working copy.
    pub fn move_to(
        &self,
        version: &str,
        kind: BranchKind,
        feature: Option<&str>,
    ) -> Result<CommitId> {
        let mut target = SemanticVersion::parse_as(version, self.settings.version_type)
            .map_err(|e| {
                ScmVersionError::config(format!("The target version is not valid: {}", e))
            })?;
        if let Some(feature) = feature.map(str::trim).filter(|f| !f.is_empty()) {
            target = target.with_branch_metadata(feature);
        }
        debug!("Target version is {}, branch type is {}", target, kind);

        let tag_name = self.naming.ref_name(BranchKind::Tag, &target.to_string());
        let name = if self.repo.tag_exists(&tag_name)? {
            tag_name
        } else if kind == BranchKind::Tag {
            return Err(ScmVersionError::scm(format!(
                "Version '{}' does not exist",
                target
            )));
        } else {
            let branch_version = target.to_string_for(self.settings.pattern_digits);
            self.find_branch(kind, &branch_version)?.ok_or_else(|| {
                ScmVersionError::scm(format!("Version '{}' does not exist", target))
            })?
        };

        if self.dry_run {
            info!("DryRun: working copy will be moved to {}", name);
            return self.repo.resolve(&name)?.ok_or_else(|| {
                ScmVersionError::scm(format!("Version '{}' does not exist", target))
            });
        }

        let commit = self.repo.checkout(&name)?;
        info!("Working copy was switched to {} with revision id {}", target, commit);
        Ok(commit)
    }

    fn find_branch(&self, kind: BranchKind, version: &str) -> Result<Option<String>> {
        let name = self.naming.ref_name(kind, version);
        let feature = if kind == BranchKind::Stabilization {
            FeatureSuffix::None
        } else {
            FeatureSuffix::Any
        };
        let filter = VersionFilter::typed(
            self.naming,
            kind,
            &name,
            kind,
            feature,
            self.settings.pattern_digits,
        );

        if let Err(e) = self.repo.fetch_all() {
            warn!("Branches were not fetched: {}", e);
        }

        Ok(self
            .repo
            .list_branches()?
            .into_iter()
            .find(|entry| entry.name == name && filter.matches(&entry.name))
            .map(|entry| entry.name))
    }

    /// Tags the pre-version when it has no release yet and moves the working
    /// copy to it. On a tag the current version is returned unchanged.
    pub fn prepare_release(&self, resolution: &Resolution) -> Result<String> {
        if resolution.branch.kind == BranchKind::Tag {
            info!("Working copy is already on tag {}", resolution.branch.name);
            return Ok(resolution.version.clone());
        }

        let version = resolution.pre_version.to_string();
        if !self.is_release_version_available(&version)? {
            self.create_tag(resolution, None)?;
        }

        if self.dry_run {
            info!("DryRun: working copy will be moved to {}", version);
            return Ok(version);
        }

        self.move_to(&version, BranchKind::Tag, None)?;
        Ok(version)
    }

    pub fn is_release_version_available(&self, version: &str) -> Result<bool> {
        previous::is_release_available(self.repo, self.naming, version)
    }

    fn push(&self, name: &str) -> Result<()> {
        match self.repo.remote_url()? {
            Some(url) => {
                debug!("Pushing {} to {}", name, url);
                self.repo.push(&[name.to_string()])
            }
            None => {
                warn!("No remote configured, {} is only available locally", name);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::resolver::VersionResolver;

    fn resolve(repo: &MockRepository, settings: &VersionSettings) -> Resolution {
        VersionResolver::new(repo, &NamingConfig::default(), settings).resolve()
    }

    #[test]
    fn test_create_tag_on_trunk() {
        let repo = MockRepository::new();
        let c1 = repo.commit("initial");
        repo.tag("RELEASE_1.0.0", &c1);
        repo.commit("change");
        repo.set_remote("https://example.com/repo.git");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let resolution = resolve(&repo, &settings);
        let manager = ReleaseManager::new(&repo, &naming, &settings, false);

        let name = manager.create_tag(&resolution, None).unwrap();
        assert_eq!(name, format!("RELEASE_{}", resolution.pre_version));
        assert_eq!(
            repo.tag_message(&name).unwrap(),
            format!("Tag {} created by scm-version", name)
        );
        assert_eq!(repo.pushed(), vec![name.clone()]);

        assert!(manager.create_tag(&resolution, None).is_err());
    }

    #[test]
    fn test_create_tag_refused_on_tag() {
        let repo = MockRepository::new();
        let c1 = repo.commit("initial");
        repo.tag("RELEASE_1.0.0", &c1);

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let resolution = resolve(&repo, &settings);
        assert_eq!(resolution.branch.kind, BranchKind::Tag);

        let manager = ReleaseManager::new(&repo, &naming, &settings, false);
        assert!(manager.create_tag(&resolution, None).is_err());
        assert!(manager.create_branch(&resolution, None).is_err());
    }

    #[test]
    fn test_create_branches() {
        let repo = MockRepository::new();
        let c1 = repo.commit("initial");
        repo.tag("RELEASE_1.0.0", &c1);
        repo.commit("change");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let resolution = resolve(&repo, &settings);
        let manager = ReleaseManager::new(&repo, &naming, &settings, false);

        let digits = resolution.pre_version.to_string_for(settings.pattern_digits);
        let stabilization = manager.create_branch(&resolution, None).unwrap();
        assert_eq!(stabilization, format!("SB_{}", digits));
        assert!(repo.branch_exists(&stabilization).unwrap());

        let feature = manager.create_branch(&resolution, Some("login")).unwrap();
        assert_eq!(feature, format!("FB_{}-login", digits));

        assert!(manager.create_branch(&resolution, None).is_err());
        assert!(repo.pushed().is_empty());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let repo = MockRepository::new();
        repo.commit("initial");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let resolution = resolve(&repo, &settings);
        let manager = ReleaseManager::new(&repo, &naming, &settings, true);

        let version = manager.prepare_release(&resolution).unwrap();
        assert_eq!(version, resolution.pre_version.to_string());
        assert!(repo.list_tags().unwrap().is_empty());
        assert_eq!(repo.current_ref_name().unwrap(), "master");
    }

    #[test]
    fn test_prepare_release_moves_to_tag() {
        let repo = MockRepository::new();
        repo.commit("initial");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let resolution = resolve(&repo, &settings);
        let manager = ReleaseManager::new(&repo, &naming, &settings, false);

        let version = manager.prepare_release(&resolution).unwrap();
        assert!(manager.is_release_version_available(&version).unwrap());
        assert_eq!(
            repo.current_revision_id().unwrap(),
            resolution.revision_id
        );
        assert_eq!(repo.head_tag().unwrap(), Some(format!("RELEASE_{}", version)));
    }

    #[test]
    fn test_move_to() {
        let repo = MockRepository::new();
        let c1 = repo.commit("initial");
        repo.tag("RELEASE_1.0.0", &c1);
        let c2 = repo.commit("stabilize");
        repo.create_branch_at("SB_1.1", &c2);
        let c3 = repo.commit("feature");
        repo.create_branch_at("FB_2.0-login", &c3);
        repo.commit("head");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let manager = ReleaseManager::new(&repo, &naming, &settings, false);

        assert_eq!(manager.move_to("1.0.0", BranchKind::Stabilization, None).unwrap(), c1);
        assert_eq!(manager.move_to("1.1", BranchKind::Stabilization, None).unwrap(), c2);
        assert_eq!(
            manager.move_to("2.0", BranchKind::Feature, Some("login")).unwrap(),
            c3
        );

        let missing = manager.move_to("9.9.9", BranchKind::Stabilization, None).unwrap_err();
        assert!(matches!(missing, ScmVersionError::ScmOperation(_)));

        let invalid = manager.move_to("x.y", BranchKind::Stabilization, None).unwrap_err();
        assert!(matches!(invalid, ScmVersionError::Config(_)));
    }

    #[test]
    fn test_move_to_branch_fetches_remote_branches() {
        let repo = MockRepository::new();
        repo.commit("initial");
        let c2 = repo.commit("stabilize");
        repo.create_branch_at("SB_1.1", &c2);
        repo.commit("head");
        repo.fail_fetch("connection refused");

        let settings = VersionSettings::default();
        let naming = NamingConfig::default();
        let manager = ReleaseManager::new(&repo, &naming, &settings, false);

        assert_eq!(manager.move_to("1.1", BranchKind::Stabilization, None).unwrap(), c2);
        assert_eq!(repo.fetched(), vec!["all"]);
    }
}
