use crate::domain::{BranchKind, DigitPos, NamingConfig, VersionType};
use crate::error::{Result, ScmVersionError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "scmversion.toml";

/// Increment override, e.g. `INCREMENT=MINOR`
pub const INCREMENT_ENV: &str = "INCREMENT";

/// Continuous release override, `CONTINUOUSRELEASE=true`
pub const CONTINUOUS_RELEASE_ENV: &str = "CONTINUOUSRELEASE";

/// Marker for builds without SCM: `RELEASE`, `SNAPSHOT` or anything else
pub const VERSION_EXT_ENV: &str = "SCMVERSIONEXT";

/// Represents the complete configuration for scm-version.
///
/// Contains the version calculation settings, the ref naming conventions,
/// change log options and credentials for remote operations.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub changelog: ChangelogConfig,

    #[serde(default)]
    pub credentials: Credentials,
}

fn default_version_type() -> String {
    "threeDigits".to_string()
}

fn default_version_branch() -> String {
    "tag".to_string()
}

fn default_pattern_digits() -> usize {
    2
}

fn default_true() -> bool {
    true
}

/// Raw version settings as written in the configuration file.
///
/// Converted into [VersionSettings] by [VersionSettings::from_config].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersionConfig {
    #[serde(default = "default_version_type")]
    pub version_type: String,

    /// MAJOR, MINOR, PATCH or HOTFIX
    #[serde(default)]
    pub increment: Option<String>,

    #[serde(default)]
    pub initial_version: Option<String>,

    /// Where versions of version-carrying branches come from: `tag` or `branch`
    #[serde(default = "default_version_branch")]
    pub version_branch: String,

    #[serde(default = "default_pattern_digits")]
    pub pattern_digits: usize,

    #[serde(default)]
    pub default_build_metadata: String,

    #[serde(default)]
    pub use_build_extension: bool,

    #[serde(default = "default_true")]
    pub major_version_only: bool,

    #[serde(default)]
    pub disable_scm: bool,

    #[serde(default)]
    pub disable_rev_ext: bool,

    #[serde(default)]
    pub continuous_release: bool,

    #[serde(default)]
    pub continuous_release_branches: Vec<String>,

    #[serde(default)]
    pub version_ext: Option<String>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        VersionConfig {
            version_type: default_version_type(),
            increment: None,
            initial_version: None,
            version_branch: default_version_branch(),
            pattern_digits: default_pattern_digits(),
            default_build_metadata: String::new(),
            use_build_extension: false,
            major_version_only: true,
            disable_scm: false,
            disable_rev_ext: false,
            continuous_release: false,
            continuous_release_branches: Vec::new(),
            version_ext: None,
        }
    }
}

fn default_changelog_file() -> PathBuf {
    PathBuf::from("build/changelog/changelog.asciidoc")
}

/// Configuration for change log generation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangelogConfig {
    #[serde(default = "default_changelog_file")]
    pub file: PathBuf,

    /// Baseline version; the previous release when unset
    #[serde(default)]
    pub previous_version: Option<String>,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        ChangelogConfig {
            file: default_changelog_file(),
            previous_version: None,
        }
    }
}

/// Credentials for fetch and push.
///
/// Username and password are used for http(s) remotes, the key file and
/// passphrase for ssh remotes.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default)]
    pub passphrase: Option<String>,
}

impl Credentials {
    /// True when remote operations have something to authenticate with
    pub fn is_configured(&self) -> bool {
        self.username.is_some() || self.key_file.is_some()
    }
}

/// Source of the version for version-carrying branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBranchType {
    Tag,
    Branch,
}

/// Validated version settings used by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSettings {
    pub version_type: VersionType,
    pub increment: Option<DigitPos>,
    /// Kept as written; an unparsable value is treated as absent
    pub initial_version: Option<String>,
    pub version_branch_type: VersionBranchType,
    pub pattern_digits: usize,
    pub default_build_metadata: String,
    pub use_build_extension: bool,
    pub major_version_only: bool,
    pub disable_scm: bool,
    pub disable_rev_ext: bool,
    pub continuous_release: bool,
    pub continuous_release_branches: Vec<String>,
    pub version_ext: Option<String>,
}

impl VersionSettings {
    /// Validates raw settings.
    ///
    /// Fails with a configuration error for an unknown version type,
    /// increment or version branch type, for `HOTFIX` on three digit
    /// versions and for a pattern digit count the version type cannot hold.
    pub fn from_config(config: &VersionConfig) -> Result<Self> {
        let version_type: VersionType = config.version_type.parse()?;

        let increment = match config.increment.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(value.parse::<DigitPos>()?),
            _ => None,
        };
        if increment == Some(DigitPos::Hotfix) && version_type == VersionType::ThreeDigits {
            return Err(ScmVersionError::config(
                "Increment HOTFIX requires version type fourDigits",
            ));
        }

        let version_branch_type = match config.version_branch.parse::<BranchKind>()? {
            BranchKind::Tag => VersionBranchType::Tag,
            BranchKind::Stabilization => VersionBranchType::Branch,
            other => {
                return Err(ScmVersionError::config(format!(
                    "Invalid version branch type '{}', possible values: tag, branch",
                    other
                )))
            }
        };

        if config.pattern_digits == 0 || config.pattern_digits > version_type.digits() {
            return Err(ScmVersionError::config(format!(
                "Pattern digits must be between 1 and {}, got {}",
                version_type.digits(),
                config.pattern_digits
            )));
        }

        Ok(VersionSettings {
            version_type,
            increment,
            initial_version: config
                .initial_version
                .clone()
                .filter(|v| !v.trim().is_empty()),
            version_branch_type,
            pattern_digits: config.pattern_digits,
            default_build_metadata: config.default_build_metadata.clone(),
            use_build_extension: config.use_build_extension,
            major_version_only: config.major_version_only,
            disable_scm: config.disable_scm,
            disable_rev_ext: config.disable_rev_ext,
            continuous_release: config.continuous_release,
            continuous_release_branches: config.continuous_release_branches.clone(),
            version_ext: config.version_ext.clone(),
        })
    }
}

impl Default for VersionSettings {
    fn default() -> Self {
        VersionSettings {
            version_type: VersionType::ThreeDigits,
            increment: None,
            initial_version: None,
            version_branch_type: VersionBranchType::Tag,
            pattern_digits: default_pattern_digits(),
            default_build_metadata: String::new(),
            use_build_extension: false,
            major_version_only: true,
            disable_scm: false,
            disable_rev_ext: false,
            continuous_release: false,
            continuous_release_branches: Vec::new(),
            version_ext: None,
        }
    }
}

impl Config {
    /// Applies `INCREMENT`, `CONTINUOUSRELEASE` and `SCMVERSIONEXT` from the
    /// process environment. Set, non-empty variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(increment) = env_value(INCREMENT_ENV) {
            debug!("{} overrides increment with {}", INCREMENT_ENV, increment);
            self.version.increment = Some(increment);
        }
        if let Some(continuous) = env_value(CONTINUOUS_RELEASE_ENV) {
            self.version.continuous_release = continuous.eq_ignore_ascii_case("true");
        }
        if let Some(ext) = env_value(VERSION_EXT_ENV) {
            self.version.version_ext = Some(ext);
        }
    }

    /// Validated version settings
    pub fn settings(&self) -> Result<VersionSettings> {
        self.naming.validate()?;
        VersionSettings::from_config(&self.version)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `scmversion.toml` in `project_dir`
/// 3. `scmversion.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, project_dir: &Path) -> Result<Config> {
    let local = project_dir.join(CONFIG_FILE_NAME);

    let path = if let Some(path) = config_path {
        path.to_path_buf()
    } else if local.exists() {
        local
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            config_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    info!("Reading configuration from {}", path.display());
    let config_str = fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&config_str).map_err(|e| {
        ScmVersionError::config(format!("Cannot parse {}: {}", path.display(), e))
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Config::default().settings().unwrap();
        assert_eq!(settings, VersionSettings::default());
        assert!(settings.major_version_only);
        assert_eq!(settings.version_branch_type, VersionBranchType::Tag);
    }

    #[test]
    fn test_invalid_increment() {
        let config = VersionConfig {
            increment: Some("BUILD".to_string()),
            ..VersionConfig::default()
        };
        assert!(matches!(
            VersionSettings::from_config(&config),
            Err(ScmVersionError::Config(_))
        ));
    }

    #[test]
    fn test_hotfix_requires_four_digits() {
        let config = VersionConfig {
            increment: Some("HOTFIX".to_string()),
            ..VersionConfig::default()
        };
        assert!(VersionSettings::from_config(&config).is_err());

        let four = VersionConfig {
            increment: Some("HOTFIX".to_string()),
            version_type: "fourDigits".to_string(),
            ..VersionConfig::default()
        };
        let settings = VersionSettings::from_config(&four).unwrap();
        assert_eq!(settings.increment, Some(DigitPos::Hotfix));
    }

    #[test]
    fn test_version_branch_type() {
        let config = VersionConfig {
            version_branch: "branch".to_string(),
            ..VersionConfig::default()
        };
        let settings = VersionSettings::from_config(&config).unwrap();
        assert_eq!(settings.version_branch_type, VersionBranchType::Branch);

        let invalid = VersionConfig {
            version_branch: "feature".to_string(),
            ..VersionConfig::default()
        };
        assert!(VersionSettings::from_config(&invalid).is_err());
    }

    #[test]
    fn test_pattern_digits_bounds() {
        let config = VersionConfig {
            pattern_digits: 4,
            ..VersionConfig::default()
        };
        assert!(VersionSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_blank_initial_version_is_absent() {
        let config = VersionConfig {
            initial_version: Some("  ".to_string()),
            ..VersionConfig::default()
        };
        let settings = VersionSettings::from_config(&config).unwrap();
        assert_eq!(settings.initial_version, None);
    }

    #[test]
    fn test_credentials_configured() {
        assert!(!Credentials::default().is_configured());
        let credentials = Credentials {
            username: Some("ci".to_string()),
            ..Credentials::default()
        };
        assert!(credentials.is_configured());
    }
}
