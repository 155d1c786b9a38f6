use crate::domain::naming::NamingConfig;
use crate::error::{Result, ScmVersionError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Leading version in a branch suffix, e.g. `7.2-login`
const VERSIONED_NAME_PATTERN: &str = r"^\d+(\.\d+)?(\.\d+)?(\.\d+)?(-.*)?$";

/// Classification of the current repository position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Trunk,
    Stabilization,
    Feature,
    Hotfix,
    Bugfix,
    Tag,
    DetachedHead,
}

impl BranchKind {
    /// Feature, hotfix and bugfix branches
    pub fn is_special(self) -> bool {
        matches!(
            self,
            BranchKind::Feature | BranchKind::Hotfix | BranchKind::Bugfix
        )
    }

    /// Trunk, stabilization branches and tags
    pub fn is_base(self) -> bool {
        matches!(
            self,
            BranchKind::Trunk | BranchKind::Stabilization | BranchKind::Tag
        )
    }

    /// Kinds whose refs are branches carrying a prefix
    pub fn is_branch_ref(self) -> bool {
        matches!(
            self,
            BranchKind::Stabilization | BranchKind::Feature | BranchKind::Hotfix | BranchKind::Bugfix
        )
    }
}

impl FromStr for BranchKind {
    type Err = ScmVersionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trunk" | "master" => Ok(BranchKind::Trunk),
            "stabilization" | "branch" => Ok(BranchKind::Stabilization),
            "feature" | "featurebranch" => Ok(BranchKind::Feature),
            "hotfix" | "hotfixbranch" => Ok(BranchKind::Hotfix),
            "bugfix" | "bugfixbranch" => Ok(BranchKind::Bugfix),
            "tag" => Ok(BranchKind::Tag),
            "detachedhead" | "detached" => Ok(BranchKind::DetachedHead),
            _ => Err(ScmVersionError::config(format!(
                "Invalid branch type '{}', possible values: trunk, stabilization, feature, hotfix, bugfix, tag",
                s
            ))),
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchKind::Trunk => "trunk",
            BranchKind::Stabilization => "stabilization",
            BranchKind::Feature => "feature",
            BranchKind::Hotfix => "hotfix",
            BranchKind::Bugfix => "bugfix",
            BranchKind::Tag => "tag",
            BranchKind::DetachedHead => "detachedHead",
        };
        write!(f, "{}", name)
    }
}

/// The current position with the metadata extracted from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Branch name, tag name, or revision id for a detached head
    pub name: String,
    pub kind: BranchKind,
    /// Feature name with any leading version removed
    pub feature_name: String,
    /// Whether the name embeds a version (`SB_7.2`, `FB_7.2-login`)
    pub branch_with_version: bool,
}

/// Classifies a ref name.
///
/// A tag on HEAD always wins. Otherwise trunk names, detached heads
/// (`ref_name == revision_id`) and then the feature, hotfix, bugfix and
/// stabilization patterns are tried in that order. Names matching nothing are
/// ad-hoc feature branches.
pub fn classify(
    ref_name: &str,
    revision_id: &str,
    head_tag: Option<&str>,
    naming: &NamingConfig,
) -> BranchInfo {
    let info = classify_name(ref_name, revision_id, head_tag, naming);
    info!("Branch name is {} and branch type {}", info.name, info.kind);
    info
}

fn classify_name(
    ref_name: &str,
    revision_id: &str,
    head_tag: Option<&str>,
    naming: &NamingConfig,
) -> BranchInfo {
    if let Some(tag) = head_tag {
        return BranchInfo {
            name: tag.to_string(),
            kind: BranchKind::Tag,
            feature_name: String::new(),
            branch_with_version: false,
        };
    }

    if naming.is_trunk(ref_name) {
        return BranchInfo {
            name: ref_name.to_string(),
            kind: BranchKind::Trunk,
            feature_name: String::new(),
            branch_with_version: false,
        };
    }

    if ref_name == revision_id {
        info!("Repo is in detached mode on {}", ref_name);
        return BranchInfo {
            name: ref_name.to_string(),
            kind: BranchKind::DetachedHead,
            feature_name: String::new(),
            branch_with_version: false,
        };
    }

    let candidates = [
        (BranchKind::Feature, naming.feature_branch_pattern()),
        (BranchKind::Hotfix, naming.hotfix_branch_pattern()),
        (BranchKind::Bugfix, naming.bugfix_branch_pattern()),
        (BranchKind::Stabilization, naming.stabilization_branch_pattern()),
    ];

    for (kind, pattern) in candidates {
        let captured = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(ref_name))
            .and_then(|caps| caps.iter().flatten().last().map(|m| m.as_str().to_string()));

        if let Some(raw) = captured {
            debug!("Branch {} matches {} pattern {}", ref_name, kind, pattern);
            let (feature_name, branch_with_version) = split_feature_name(&raw);
            return BranchInfo {
                name: ref_name.to_string(),
                kind,
                feature_name: if kind == BranchKind::Stabilization {
                    String::new()
                } else {
                    feature_name
                },
                branch_with_version,
            };
        }
    }

    let (feature_name, branch_with_version) = split_feature_name(ref_name);
    BranchInfo {
        name: ref_name.to_string(),
        kind: BranchKind::Feature,
        feature_name,
        branch_with_version,
    }
}

/// Splits `7.2-login` into (`login`, true); names without a leading version
/// are returned unchanged with `false`.
fn split_feature_name(raw: &str) -> (String, bool) {
    let captures = Regex::new(VERSIONED_NAME_PATTERN)
        .ok()
        .and_then(|re| re.captures(raw));

    match captures {
        Some(caps) => {
            let rest = caps.get(4).map(|m| m.as_str()).unwrap_or("");
            (rest.strip_prefix('-').unwrap_or(rest).to_string(), true)
        }
        None => (raw.to_string(), false),
    }
}
