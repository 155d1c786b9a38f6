//! Version resolution
//!
//! Turns the repository position into a version in three steps:
//!
//! 1. locate a base version from tags, branches or the branch name
//! 2. derive the pre-version by applying the increment policy
//! 3. render the final string with revision and SNAPSHOT extensions
//!
//! Resolution never fails. Whatever cannot be read falls through to the
//! default version and is reported as a [ResolutionWarning].

use crate::config::{VersionBranchType, VersionSettings};
use crate::domain::{
    classify, BranchInfo, BranchKind, DigitPos, NamingConfig, SemanticVersion, SNAPSHOT,
};
use crate::error::Result;
use crate::filter::{FeatureSuffix, RefObject, VersionFilter};
use crate::git::{CommitId, RefEntry, Repository};
use crate::warning::ResolutionWarning;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Prefix of the revision extension, `rev.id.<8 hex>`
pub const REV_ID_PREFIX: &str = "rev.id.";

/// Marker for `version_ext` returning the initial version unchanged
pub const RELEASE_MARKER: &str = "RELEASE";

/// Base version located in the repository
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVersion {
    /// Tag or branch the version was taken from
    pub source_ref_name: String,
    pub version: SemanticVersion,
    /// True when the working copy differs from the located ref
    pub changed: bool,
    pub from_branch_name: bool,
    pub is_default: bool,
}

/// Everything computed for one resolution request
#[derive(Debug, Clone)]
pub struct Resolution {
    pub branch: BranchInfo,
    pub revision_id: CommitId,
    pub dirty: bool,
    pub resolved: ResolvedVersion,
    pub pre_version: SemanticVersion,
    pub version: String,
    pub warnings: Vec<ResolutionWarning>,
}

/// Map of commit id to a matching ref and its parsed version
type VersionMap = HashMap<CommitId, (RefObject, SemanticVersion)>;

pub struct VersionResolver<'a> {
    repo: &'a dyn Repository,
    naming: &'a NamingConfig,
    settings: &'a VersionSettings,
}

impl<'a> VersionResolver<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        naming: &'a NamingConfig,
        settings: &'a VersionSettings,
    ) -> Self {
        VersionResolver {
            repo,
            naming,
            settings,
        }
    }

    pub fn resolve(&self) -> Resolution {
        let mut warnings = Vec::new();

        if !self.settings.disable_scm {
            if let Err(e) = self.repo.fetch_tags() {
                warn!("Tags were not fetched: {}", e);
                self.remote_unavailable(&e.to_string(), &mut warnings);
            }
        }

        let revision_id = self.repo.current_revision_id().unwrap_or_else(|e| {
            unreadable(&mut warnings, "HEAD revision", &e.to_string());
            String::new()
        });
        let ref_name = self.repo.current_ref_name().unwrap_or_else(|e| {
            unreadable(&mut warnings, "current branch", &e.to_string());
            self.naming
                .trunk_branches
                .first()
                .cloned()
                .unwrap_or_else(|| "master".to_string())
        });
        let head_tag = self.repo.head_tag().unwrap_or_else(|e| {
            unreadable(&mut warnings, "tags on HEAD", &e.to_string());
            None
        });
        let dirty = self.repo.is_dirty().unwrap_or_else(|e| {
            unreadable(&mut warnings, "working tree status", &e.to_string());
            true
        });

        let branch = classify(&ref_name, &revision_id, head_tag.as_deref(), self.naming);

        let located = if revision_id.is_empty() {
            Ok(None)
        } else {
            self.locate(&branch, &revision_id, dirty, &mut warnings)
        };
        let resolved = match located {
            Ok(Some(resolved)) => resolved,
            Ok(None) => self.fallback(&branch, "no version tag or branch found", &mut warnings),
            Err(e) => {
                unreadable(&mut warnings, "version refs", &e.to_string());
                self.fallback(&branch, "repository could not be read", &mut warnings)
            }
        };

        let pre_version = self.pre_version(&branch, &resolved);
        let version = self.final_version(
            &branch,
            &resolved,
            &pre_version,
            &revision_id,
            dirty,
            &mut warnings,
        );

        Resolution {
            branch,
            revision_id,
            dirty,
            resolved,
            pre_version,
            version,
            warnings,
        }
    }

    /// The initial version, or the zero version when none is configured or
    /// it cannot be parsed
    pub fn default_version(&self, warnings: &mut Vec<ResolutionWarning>) -> SemanticVersion {
        let zero = SemanticVersion::zero(self.settings.version_type);
        let Some(initial) = self.settings.initial_version.as_deref() else {
            return zero;
        };
        match SemanticVersion::parse_as(initial, self.settings.version_type) {
            Ok(version) => version,
            Err(e) => {
                warn!("It was not possible to parse the initial version from configured value: {}", e);
                warnings.push(ResolutionWarning::UnparsableVersion {
                    value: initial.to_string(),
                    setting: "initial".to_string(),
                });
                zero
            }
        }
    }

    fn remote_unavailable(&self, reason: &str, warnings: &mut Vec<ResolutionWarning>) {
        let remote = self.repo.remote_url().ok().flatten();
        warnings.push(ResolutionWarning::RemoteUnavailable {
            remote: remote.unwrap_or_else(|| "origin".to_string()),
            reason: reason.to_string(),
        });
    }

    /// Local and remote branches, after fetching every ref from the remote
    fn branches(&self, warnings: &mut Vec<ResolutionWarning>) -> Result<Vec<RefEntry>> {
        if !self.settings.disable_scm {
            if let Err(e) = self.repo.fetch_all() {
                warn!("Branches were not fetched: {}", e);
                self.remote_unavailable(&e.to_string(), warnings);
            }
        }
        self.repo.list_branches()
    }

    /// Typed filter of `kind` derived from the current branch
    fn branch_filter(&self, kind: BranchKind, branch: &BranchInfo) -> VersionFilter {
        VersionFilter::typed(
            self.naming,
            kind,
            &branch.name,
            branch.kind,
            FeatureSuffix::from_name(&branch.feature_name),
            self.settings.pattern_digits,
        )
    }

    /// Parses the versions of refs matching `filter`. `feature` is the
    /// branch metadata the refs carry, if any.
    fn version_map(
        &self,
        filter: &VersionFilter,
        entries: &[RefEntry],
        feature: &str,
    ) -> VersionMap {
        filter
            .ref_map(entries)
            .into_iter()
            .filter_map(|(commit, object)| {
                let parsed = SemanticVersion::parse_for_branch(
                    &object.version,
                    self.settings.version_type,
                    feature,
                );
                match parsed {
                    Ok(version) => Some((commit, (object, version))),
                    Err(e) => {
                        debug!("Ref {} is ignored: {}", object.name, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn locate(
        &self,
        branch: &BranchInfo,
        head: &str,
        dirty: bool,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Result<Option<ResolvedVersion>> {
        let feature = branch.feature_name.as_str();
        let tags = self.repo.list_tags()?;
        let typed_tags =
            self.version_map(&self.branch_filter(BranchKind::Tag, branch), &tags, feature);
        let bare_tags = self.version_map(&VersionFilter::tags(self.naming), &tags, "");

        let branch_kind = if branch.feature_name.is_empty() {
            BranchKind::Stabilization
        } else {
            branch.kind
        };
        let branch_filter = self.branch_filter(branch_kind, branch);

        let mut resolved = self.version_from_tags(branch, head, dirty, &typed_tags, &bare_tags)?;

        let mut branches: Option<VersionMap> = None;

        if resolved.is_none()
            && branch.branch_with_version
            && self.settings.version_branch_type == VersionBranchType::Branch
        {
            let entries = self.branches(warnings)?;
            let map = branches.insert(self.version_map(&branch_filter, &entries, feature));
            resolved = self.version_from_branches(branch, head, map)?;
        }

        if resolved.is_none() && branch.kind == BranchKind::Trunk {
            let map = match branches.take() {
                Some(map) => map,
                None => {
                    let entries = self.branches(warnings)?;
                    self.version_map(&branch_filter, &entries, feature)
                }
            };
            resolved = latest_release_line(branch, &map);
        }

        if resolved.is_none() && branch.kind.is_special() {
            let version_str = branch_filter.extract_version(&branch.name);
            if !version_str.is_empty() {
                let parsed = SemanticVersion::parse_for_branch(
                    &version_str,
                    self.settings.version_type,
                    feature,
                );
                match parsed {
                    Ok(version) => {
                        info!("Version {} from branch name {}", version, branch.name);
                        resolved = Some(ResolvedVersion {
                            source_ref_name: branch.name.clone(),
                            version,
                            changed: true,
                            from_branch_name: false,
                            is_default: false,
                        });
                    }
                    Err(e) => warn!("Branch name {} carries no usable version: {}", branch.name, e),
                }
            }
        }

        if dirty {
            if let Some(resolved) = resolved.as_mut() {
                resolved.changed = true;
            }
        }

        Ok(resolved)
    }

    fn version_from_tags(
        &self,
        branch: &BranchInfo,
        head: &str,
        dirty: bool,
        tags: &VersionMap,
        bare_tags: &VersionMap,
    ) -> Result<Option<ResolvedVersion>> {
        if tags.is_empty() && bare_tags.is_empty() {
            return Ok(None);
        }

        let mut resolved = None;
        let mut pos = 0usize;

        for commit in self.repo.walk_ancestry(head)? {
            let commit = commit?;
            let tag = tags.get(&commit).or_else(|| {
                if branch.branch_with_version {
                    None
                } else {
                    bare_tags.get(&commit)
                }
            });

            let Some((object, version)) = tag else {
                pos += 1;
                debug!("Next step in walk to tag from {}", commit);
                continue;
            };

            if pos == 0 {
                info!("Version from tag {}", object.name);
                resolved = Some(ResolvedVersion {
                    source_ref_name: object.name.clone(),
                    version: version.clone(),
                    changed: false,
                    from_branch_name: false,
                    is_default: false,
                });
            } else if self.settings.version_branch_type == VersionBranchType::Tag {
                info!("Version from tag {}, but there are {} changes.", object.name, pos);
                let version = if branch.kind.is_base() {
                    version.clone()
                } else {
                    version.with_branch_metadata(&branch.feature_name)
                };
                resolved = Some(ResolvedVersion {
                    source_ref_name: branch.name.clone(),
                    version,
                    changed: true,
                    from_branch_name: false,
                    is_default: false,
                });
            }
            break;
        }

        if branch.kind != BranchKind::Tag && !branch.branch_with_version {
            if let Some(resolved) = resolved.as_mut() {
                resolved.changed = pos != 0 || dirty;
                if pos > 0 {
                    info!("There are {} commits after the last tag.", pos);
                }
                resolved.from_branch_name = branch.kind != BranchKind::Trunk;
                resolved.version = resolved.version.with_branch_metadata(&branch.feature_name);
            }
        }

        Ok(resolved)
    }

    fn version_from_branches(
        &self,
        branch: &BranchInfo,
        head: &str,
        branches: &VersionMap,
    ) -> Result<Option<ResolvedVersion>> {
        if branches.is_empty() {
            return Ok(None);
        }

        for commit in self.repo.walk_ancestry(head)? {
            let commit = commit?;
            if let Some((object, version)) = branches.get(&commit) {
                debug!("Version from branch {}", object.name);
                return Ok(Some(ResolvedVersion {
                    source_ref_name: object.name.clone(),
                    version: version.clone(),
                    changed: true,
                    from_branch_name: object.name == branch.name,
                    is_default: false,
                }));
            }
            debug!("Next step in walk to branch from {}", commit);
        }

        Ok(None)
    }

    fn fallback(
        &self,
        branch: &BranchInfo,
        reason: &str,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> ResolvedVersion {
        let mut version = self.default_version(warnings);
        if !branch.kind.is_base() {
            version = version.with_branch_metadata(&branch.feature_name);
        }
        warn!(
            "It is not possible to identify the correct version. The default value {} will be used",
            version
        );
        warnings.push(ResolutionWarning::FallbackVersion {
            version: version.to_string(),
            reason: reason.to_string(),
        });

        ResolvedVersion {
            source_ref_name: branch.name.clone(),
            version,
            changed: true,
            from_branch_name: false,
            is_default: true,
        }
    }

    /// Applies the increment policy to the located version
    pub fn pre_version(&self, branch: &BranchInfo, resolved: &ResolvedVersion) -> SemanticVersion {
        info!(
            "Version analysis: source: {}, version: {}, changed: {}, fromBranch: {}, default: {}",
            resolved.source_ref_name,
            resolved.version,
            resolved.changed,
            resolved.from_branch_name,
            resolved.is_default
        );

        let version = &resolved.version;
        if resolved.is_default || (!resolved.changed && resolved.from_branch_name) {
            return version.clone();
        }

        if branch.kind.is_special() {
            if self.settings.major_version_only {
                let mut major = version.major();
                if self.settings.increment == Some(DigitPos::Major) {
                    major += 1;
                }
                return SemanticVersion::for_integers(major, version.version_type())
                    .with_branch_metadata(version.branch_metadata().unwrap_or_default());
            }
            if resolved.changed {
                return if version.build_metadata().is_some() {
                    version.increment_build_metadata()
                } else {
                    version.with_build_metadata(&self.settings.default_build_metadata)
                };
            }
            return version.clone();
        }

        if !resolved.changed {
            return version.clone();
        }

        match self.settings.increment {
            Some(pos) => version.increment(pos),
            None if branch.kind == BranchKind::Trunk => version.increment_latest(),
            None => version.increment_version(),
        }
    }

    /// `rev.id.<first 8 chars>` for trunk, continuous release branches and
    /// detached heads, empty otherwise
    pub fn revision_extension(&self, branch: &BranchInfo, revision_id: &str) -> String {
        if self.settings.disable_rev_ext || revision_id.is_empty() {
            return String::new();
        }
        let qualifies = branch.kind == BranchKind::Trunk
            || branch.kind == BranchKind::DetachedHead
            || self.settings.continuous_release_branches.contains(&branch.name);
        if !qualifies {
            return String::new();
        }
        let short: String = revision_id.chars().take(8).collect();
        format!("{}{}", REV_ID_PREFIX, short)
    }

    fn final_version(
        &self,
        branch: &BranchInfo,
        resolved: &ResolvedVersion,
        pre_version: &SemanticVersion,
        revision_id: &str,
        dirty: bool,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> String {
        if self.settings.disable_scm {
            let initial = match self.settings.initial_version.as_deref().map(str::trim) {
                Some(initial) if !initial.is_empty() => initial.to_string(),
                _ => self.default_version(warnings).to_string(),
            };
            return match self.settings.version_ext.as_deref() {
                Some(RELEASE_MARKER) => initial,
                Some(SNAPSHOT) => format!("{}-{}", initial, SNAPSHOT),
                _ => format!("{}-{}", initial, Utc::now().format("%Y%m%d%H%M%S")),
            };
        }

        let extension = self.revision_extension(branch, revision_id);

        if self.settings.continuous_release && !extension.is_empty() && !dirty {
            info!("Version {} will be extended with revID '{}'", pre_version, extension);
            return pre_version.with_build_metadata(&extension).to_string();
        }

        if branch.kind == BranchKind::DetachedHead {
            let detached = pre_version.with_build_metadata(&extension);
            info!(
                "Version {} will be extended with revID for detached head and SNAPSHOT '{}'",
                pre_version, extension
            );
            return format!("{}-{}", detached, SNAPSHOT);
        }

        if !resolved.changed {
            info!("Version {} will be used without extension (No changes detected!).", pre_version);
            return pre_version.to_string();
        }

        if self.settings.use_build_extension {
            info!("Version {} will be extended with SNAPSHOT", pre_version);
            format!("{}-{}", pre_version, SNAPSHOT)
        } else {
            info!("Version {} will be extended with SNAPSHOT.", pre_version.normal_version());
            pre_version.with_build_metadata(SNAPSHOT).to_string()
        }
    }
}

/// Highest version over all stabilization branches
fn latest_release_line(branch: &BranchInfo, branches: &VersionMap) -> Option<ResolvedVersion> {
    let latest = branches.values().map(|(_, version)| version).max()?;
    debug!("Version found and latest {} will be used.", latest);
    Some(ResolvedVersion {
        source_ref_name: branch.name.clone(),
        version: latest.clone(),
        changed: true,
        from_branch_name: false,
        is_default: false,
    })
}

fn unreadable(warnings: &mut Vec<ResolutionWarning>, what: &str, reason: &str) {
    warn!("Cannot read {}: {}", what, reason);
    warnings.push(ResolutionWarning::RepositoryUnreadable {
        reason: format!("{}: {}", what, reason),
    });
}
