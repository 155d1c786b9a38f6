//! Regular expression filters recognising version-carrying branch and tag names

use crate::domain::{BranchKind, NamingConfig, SemanticVersion, VersionType};
use crate::git::{CommitId, RefEntry};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Version part of a ref name, up to four dot separated numbers
const VERSION_CAPTURE: &str = r"(\d+(?:\.\d+)?(?:\.\d+)?(?:\.\d+)?)";

/// Optional build suffix accepted on tags, e.g. `-rc1` or `-dev.2`
const BUILD_SUFFIX: &str = r"(?:-(\w+\.?\d+))?";

/// Feature part a typed filter expects after the version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSuffix {
    None,
    Name(String),
    /// Any feature name
    Any,
}

impl FeatureSuffix {
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            FeatureSuffix::None
        } else {
            FeatureSuffix::Name(name.to_string())
        }
    }
}

/// A branch or tag whose name carries a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefObject {
    pub commit: CommitId,
    pub version: String,
    pub name: String,
}

/// Anchored pattern matching version-carrying ref names
#[derive(Debug, Clone)]
pub struct VersionFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl VersionFilter {
    fn from_pattern(pattern: String) -> Self {
        debug!("Branch filter is {}", pattern);
        let regex = match Regex::new(&pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Filter pattern {} is invalid: {}", pattern, e);
                None
            }
        };
        VersionFilter { pattern, regex }
    }

    /// Matches every tag `{tagPrefix}{tagSep}N[.N[.N[.N]]][-build]`
    pub fn tags(naming: &NamingConfig) -> Self {
        Self::from_pattern(format!(
            r"^{}{}(\d+(?:\.\d+){{0,3}}){}$",
            regex::escape(&naming.tag_prefix),
            regex::escape(naming.tag_separator()),
            BUILD_SUFFIX
        ))
    }

    /// Filter for refs of `kind` compatible with a reference name.
    ///
    /// The version embedded in `reference` (a ref of `reference_kind`) fixes
    /// the first `significant_digits` components of the pattern; remaining
    /// components match any number.
    pub fn typed(
        naming: &NamingConfig,
        kind: BranchKind,
        reference: &str,
        reference_kind: BranchKind,
        feature: FeatureSuffix,
        significant_digits: usize,
    ) -> Self {
        let mut digits: Vec<String> = vec![
            r"\d+".to_string(),
            r"(?:\.\d+)?".to_string(),
            r"(?:\.\d+)?".to_string(),
            r"(?:\.\d+)?".to_string(),
        ];

        let reference_pattern = format!(
            r"^.*?{}{}(?:-.*)?$",
            regex::escape(naming.separator(reference_kind)),
            VERSION_CAPTURE
        );
        let reference_version = Regex::new(&reference_pattern)
            .ok()
            .and_then(|re| re.captures(reference))
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()));

        if let Some(version) = reference_version {
            for (i, n) in version.split('.').take(significant_digits).enumerate() {
                digits[i] = if i == 0 {
                    n.to_string()
                } else {
                    format!(r"\.{}", n)
                };
            }
        }

        let mut pattern = format!(
            "^{}{}({})",
            regex::escape(naming.prefix(kind)),
            regex::escape(naming.separator(kind)),
            digits.concat()
        );

        let takes_feature = matches!(
            kind,
            BranchKind::Feature | BranchKind::Bugfix | BranchKind::Hotfix | BranchKind::Tag
        );
        match &feature {
            FeatureSuffix::Name(name) if takes_feature => {
                pattern.push('-');
                pattern.push_str(&regex::escape(name));
            }
            FeatureSuffix::Any if takes_feature => pattern.push_str("-.*"),
            FeatureSuffix::None if kind == BranchKind::Tag => pattern.push_str("(?:-.*)?"),
            _ => {}
        }
        if kind == BranchKind::Tag {
            pattern.push_str(BUILD_SUFFIX);
        }
        pattern.push('$');

        Self::from_pattern(pattern)
    }

    /// Matches release tags with exactly the component count and branch
    /// metadata of `pre_version`
    pub fn release(naming: &NamingConfig, pre_version: &SemanticVersion) -> Self {
        let mut pattern = format!(
            "^{}{}",
            regex::escape(&naming.tag_prefix),
            regex::escape(naming.tag_separator())
        );
        pattern.push_str(match pre_version.version_type() {
            VersionType::ThreeDigits => r"(\d+\.\d+\.\d+)",
            VersionType::FourDigits => r"(\d+\.\d+\.\d+\.\d+)",
        });
        if let Some(branch) = pre_version.branch_metadata() {
            pattern.push('-');
            pattern.push_str(&regex::escape(branch));
        }
        pattern.push_str(BUILD_SUFFIX);
        pattern.push('$');

        Self::from_pattern(pattern)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Text from the start of the version to the end of `name`, or an empty
    /// string when `name` does not match.
    pub fn extract_version(&self, name: &str) -> String {
        self.regex
            .as_ref()
            .and_then(|re| re.captures(name))
            .and_then(|caps| caps.get(1))
            .map(|m| name[m.start()..].to_string())
            .unwrap_or_default()
    }

    /// Maps commit ids to the matching refs pointing at them. When several
    /// refs point at one commit the highest version wins.
    pub fn ref_map(&self, entries: &[RefEntry]) -> HashMap<CommitId, RefObject> {
        let mut map: HashMap<CommitId, RefObject> = HashMap::new();

        for entry in entries {
            let version = self.extract_version(&entry.name);
            if version.is_empty() {
                continue;
            }
            let candidate = RefObject {
                commit: entry.commit.clone(),
                version,
                name: entry.name.clone(),
            };

            match map.get(&entry.commit) {
                Some(existing) if !is_higher(&candidate.version, &existing.version) => {}
                _ => {
                    map.insert(entry.commit.clone(), candidate);
                }
            }
        }

        debug!("Filter {} matched {} refs", self.pattern, map.len());
        map
    }
}

fn is_higher(candidate: &str, existing: &str) -> bool {
    match (
        SemanticVersion::parse(candidate),
        SemanticVersion::parse(existing),
    ) {
        (Ok(c), Ok(e)) => c > e,
        (Ok(_), Err(_)) => true,
        _ => false,
    }
}
