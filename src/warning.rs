use std::fmt;

/// Non-fatal issues found while resolving a version.
/// Resolution always produces a version; these explain a fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionWarning {
    /// No version source was found and the default version is used
    FallbackVersion { version: String, reason: String },
    /// A configured version string cannot be parsed and is ignored
    UnparsableVersion { value: String, setting: String },
    /// A repository query failed while locating the base version
    RepositoryUnreadable { reason: String },
    /// Fetching from the remote failed, local refs are used
    RemoteUnavailable { remote: String, reason: String },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::FallbackVersion { version, reason } => {
                write!(f, "Using fallback version {} ({})", version, reason)
            }
            ResolutionWarning::UnparsableVersion { value, setting } => {
                write!(
                    f,
                    "It was not possible to parse the {} version '{}'",
                    setting, value
                )
            }
            ResolutionWarning::RepositoryUnreadable { reason } => {
                write!(f, "Repository could not be read: {}", reason)
            }
            ResolutionWarning::RemoteUnavailable { remote, reason } => {
                write!(
                    f,
                    "Remote '{}' is not available, using local refs: {}",
                    remote, reason
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_display() {
        let warning = ResolutionWarning::FallbackVersion {
            version: "1.0.0".to_string(),
            reason: "no tags".to_string(),
        };
        assert_eq!(warning.to_string(), "Using fallback version 1.0.0 (no tags)");
    }

    #[test]
    fn test_unparsable_display() {
        let warning = ResolutionWarning::UnparsableVersion {
            value: "x.y".to_string(),
            setting: "initial".to_string(),
        };
        assert!(warning.to_string().contains("initial version 'x.y'"));
    }
}
