use crate::domain::{BranchKind, NamingConfig, SemanticVersion};
use crate::error::{Result, ScmVersionError};
use crate::filter::{RefObject, VersionFilter};
use crate::git::Repository;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A release version and the tag carrying it
#[derive(Debug, Clone, PartialEq)]
pub struct VersionTag {
    pub version: SemanticVersion,
    pub reference: RefObject,
}

/// Release tags compatible with a pre-version, ordered by version
#[derive(Debug, Clone)]
pub struct PreviousVersionIndex {
    pre_version: SemanticVersion,
    use_build_extension: bool,
    tags: BTreeMap<SemanticVersion, VersionTag>,
}

impl PreviousVersionIndex {
    /// Indexes every tag matching the release filter of `pre_version`
    pub fn build(
        repo: &dyn Repository,
        naming: &NamingConfig,
        pre_version: &SemanticVersion,
        use_build_extension: bool,
    ) -> Result<Self> {
        let filter = VersionFilter::release(naming, pre_version);
        let feature = pre_version.branch_metadata().unwrap_or_default();
        let mut tags = BTreeMap::new();

        for entry in repo.list_tags()? {
            let version_str = filter.extract_version(&entry.name);
            if version_str.is_empty() {
                continue;
            }
            match SemanticVersion::parse_for_branch(
                &version_str,
                pre_version.version_type(),
                feature,
            ) {
                Ok(version) => {
                    tags.insert(
                        version.clone(),
                        VersionTag {
                            version,
                            reference: RefObject {
                                commit: entry.commit,
                                version: version_str,
                                name: entry.name,
                            },
                        },
                    );
                }
                Err(e) => debug!("Tag {} is ignored: {}", entry.name, e),
            }
        }

        debug!("{} release tags found for {}", tags.len(), pre_version);
        Ok(PreviousVersionIndex {
            pre_version: pre_version.clone(),
            use_build_extension,
            tags,
        })
    }

    /// Indexed versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &SemanticVersion> {
        self.tags.keys()
    }

    /// Highest release below the pre-version. Versions with build metadata
    /// only count when the build extension is used.
    pub fn previous_version(&self) -> Option<&SemanticVersion> {
        self.tags
            .keys()
            .rev()
            .filter(|v| self.use_build_extension || v.build_metadata().is_none())
            .find(|v| **v < self.pre_version)
    }

    /// Tag of an explicitly requested version, or of the previous version
    /// when none is requested.
    ///
    /// # Errors
    /// `ReleaseNotFound` carrying the requested string when no such release
    /// tag exists.
    pub fn previous_version_tag(&self, requested: Option<&str>) -> Result<&VersionTag> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => {
                let version = SemanticVersion::parse_for_branch(
                    requested,
                    self.pre_version.version_type(),
                    self.pre_version.branch_metadata().unwrap_or_default(),
                )
                .map_err(|e| {
                    warn!("It was not possible to parse the previous version from configured value: {}", e);
                    ScmVersionError::release_not_found(format!(
                        "The configured previous version '{}' is not available",
                        requested
                    ))
                })?;
                self.tags.get(&version).ok_or_else(|| {
                    ScmVersionError::release_not_found(format!(
                        "The configured previous version '{}' is not available",
                        requested
                    ))
                })
            }
            None => self
                .previous_version()
                .and_then(|version| self.tags.get(version))
                .ok_or_else(|| {
                    ScmVersionError::release_not_found(format!(
                        "There is no previous version for {}",
                        self.pre_version
                    ))
                }),
        }
    }
}

/// True when a release tag for `version` exists
pub fn is_release_available(
    repo: &dyn Repository,
    naming: &NamingConfig,
    version: &str,
) -> Result<bool> {
    repo.tag_exists(&naming.ref_name(BranchKind::Tag, version))
}
