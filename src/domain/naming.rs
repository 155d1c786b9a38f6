use crate::domain::branch::BranchKind;
use crate::error::{Result, ScmVersionError};
use serde::{Deserialize, Serialize};

fn default_trunk_branches() -> Vec<String> {
    vec!["master".to_string(), "main".to_string(), "trunk".to_string()]
}

/// Naming conventions for version-carrying branches and tags.
///
/// A ref name is `{prefix}{separator}{version}[-{feature}]`, e.g. `SB_7.2`,
/// `FB_7.2-login` or `RELEASE_7.2.1`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NamingConfig {
    pub stabilization_prefix: String,
    pub feature_prefix: String,
    pub hotfix_prefix: String,
    pub bugfix_prefix: String,
    pub tag_prefix: String,
    pub prefix_separator: String,
    pub branch_prefix_separator: Option<String>,
    pub tag_prefix_separator: Option<String>,
    #[serde(default = "default_trunk_branches")]
    pub trunk_branches: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        NamingConfig {
            stabilization_prefix: "SB".to_string(),
            feature_prefix: "FB".to_string(),
            hotfix_prefix: "HB".to_string(),
            bugfix_prefix: "BB".to_string(),
            tag_prefix: "RELEASE".to_string(),
            prefix_separator: "_".to_string(),
            branch_prefix_separator: None,
            tag_prefix_separator: None,
            trunk_branches: default_trunk_branches(),
        }
    }
}

impl NamingConfig {
    /// Separator used between prefix and version on branches
    pub fn branch_separator(&self) -> &str {
        match self.branch_prefix_separator.as_deref() {
            Some(sep) if !sep.is_empty() => sep,
            _ => &self.prefix_separator,
        }
    }

    /// Separator used between prefix and version on tags
    pub fn tag_separator(&self) -> &str {
        match self.tag_prefix_separator.as_deref() {
            Some(sep) if !sep.is_empty() => sep,
            _ => &self.prefix_separator,
        }
    }

    /// Separator for refs of the given kind
    pub fn separator(&self, kind: BranchKind) -> &str {
        if kind.is_branch_ref() {
            self.branch_separator()
        } else {
            self.tag_separator()
        }
    }

    /// Prefix for refs of the given kind. Kinds without a prefix of their
    /// own (trunk, detached head) use the tag prefix.
    pub fn prefix(&self, kind: BranchKind) -> &str {
        match kind {
            BranchKind::Stabilization => &self.stabilization_prefix,
            BranchKind::Feature => &self.feature_prefix,
            BranchKind::Hotfix => &self.hotfix_prefix,
            BranchKind::Bugfix => &self.bugfix_prefix,
            BranchKind::Trunk | BranchKind::Tag | BranchKind::DetachedHead => &self.tag_prefix,
        }
    }

    /// Branch kind owning a configured prefix
    pub fn kind_for_prefix(&self, prefix: &str) -> Result<BranchKind> {
        [
            BranchKind::Stabilization,
            BranchKind::Feature,
            BranchKind::Hotfix,
            BranchKind::Bugfix,
            BranchKind::Tag,
        ]
        .into_iter()
        .find(|kind| self.prefix(*kind) == prefix)
        .ok_or_else(|| ScmVersionError::config(format!("Prefix '{}' is not configured", prefix)))
    }

    pub fn is_trunk(&self, name: &str) -> bool {
        self.trunk_branches.iter().any(|t| t == name)
    }

    fn branch_pattern(&self, prefix: &str) -> String {
        format!(
            "^{}{}(.*)$",
            regex::escape(prefix),
            regex::escape(self.branch_separator())
        )
    }

    pub fn feature_branch_pattern(&self) -> String {
        self.branch_pattern(&self.feature_prefix)
    }

    pub fn hotfix_branch_pattern(&self) -> String {
        self.branch_pattern(&self.hotfix_prefix)
    }

    pub fn bugfix_branch_pattern(&self) -> String {
        self.branch_pattern(&self.bugfix_prefix)
    }

    pub fn stabilization_branch_pattern(&self) -> String {
        self.branch_pattern(&self.stabilization_prefix)
    }

    /// Ref name for a version, e.g. `RELEASE_1.2.0` or `FB_1.2-login`
    pub fn ref_name(&self, kind: BranchKind, version: &str) -> String {
        format!("{}{}{}", self.prefix(kind), self.separator(kind), version)
    }

    /// Rejects empty prefixes and prefixes that would make classification
    /// ambiguous.
    pub fn validate(&self) -> Result<()> {
        if self.prefix_separator.is_empty() {
            return Err(ScmVersionError::config("Prefix separator must not be empty"));
        }

        let kinds = [
            BranchKind::Stabilization,
            BranchKind::Feature,
            BranchKind::Hotfix,
            BranchKind::Bugfix,
            BranchKind::Tag,
        ];

        for kind in kinds {
            if self.prefix(kind).is_empty() {
                return Err(ScmVersionError::config(format!(
                    "Prefix for {} must not be empty",
                    kind
                )));
            }
        }

        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                if self.separator(*a) != self.separator(*b) {
                    continue;
                }
                let lead_a = format!("{}{}", self.prefix(*a), self.separator(*a));
                let lead_b = format!("{}{}", self.prefix(*b), self.separator(*b));
                if lead_a.starts_with(&lead_b) || lead_b.starts_with(&lead_a) {
                    return Err(ScmVersionError::config(format!(
                        "Prefixes '{}' ({}) and '{}' ({}) are ambiguous",
                        self.prefix(*a),
                        a,
                        self.prefix(*b),
                        b
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let naming = NamingConfig::default();
        assert_eq!(naming.prefix(BranchKind::Stabilization), "SB");
        assert_eq!(naming.prefix(BranchKind::Tag), "RELEASE");
        assert_eq!(naming.prefix(BranchKind::Trunk), "RELEASE");
        assert_eq!(naming.separator(BranchKind::Feature), "_");
        assert!(naming.validate().is_ok());
    }

    #[test]
    fn test_distinct_separators() {
        let naming = NamingConfig {
            branch_prefix_separator: Some("/".to_string()),
            tag_prefix_separator: Some("-".to_string()),
            ..NamingConfig::default()
        };
        assert_eq!(naming.ref_name(BranchKind::Feature, "1.0-login"), "FB/1.0-login");
        assert_eq!(naming.ref_name(BranchKind::Tag, "1.0.0"), "RELEASE-1.0.0");
        assert_eq!(naming.feature_branch_pattern(), "^FB/(.*)$");
    }

    #[test]
    fn test_empty_branch_separator_falls_back() {
        let naming = NamingConfig {
            branch_prefix_separator: Some(String::new()),
            ..NamingConfig::default()
        };
        assert_eq!(naming.branch_separator(), "_");
    }

    #[test]
    fn test_kind_for_prefix() {
        let naming = NamingConfig::default();
        assert_eq!(naming.kind_for_prefix("HB").unwrap(), BranchKind::Hotfix);
        assert!(naming.kind_for_prefix("XX").is_err());
    }

    #[test]
    fn test_validate_rejects_ambiguous_prefixes() {
        let naming = NamingConfig {
            feature_prefix: "SB".to_string(),
            ..NamingConfig::default()
        };
        assert!(naming.validate().is_err());

        let nested = NamingConfig {
            feature_prefix: "SB_X".to_string(),
            ..NamingConfig::default()
        };
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let naming = NamingConfig {
            bugfix_prefix: String::new(),
            ..NamingConfig::default()
        };
        assert!(matches!(naming.validate(), Err(ScmVersionError::Config(_))));
    }

    #[test]
    fn test_same_prefix_with_distinct_separators_is_valid() {
        let naming = NamingConfig {
            tag_prefix: "SB".to_string(),
            tag_prefix_separator: Some("-".to_string()),
            ..NamingConfig::default()
        };
        assert!(naming.validate().is_ok());
    }
}
