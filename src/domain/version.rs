use crate::error::{Result, ScmVersionError};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Separator between the numeric part of a version and its metadata.
pub const METADATA_SEPARATOR: &str = "-";

/// Build metadata marking a version that is not a release.
pub const SNAPSHOT: &str = "SNAPSHOT";

/// Number of numeric components a version carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionType {
    ThreeDigits,
    FourDigits,
}

impl VersionType {
    /// Number of numeric components for this type
    pub fn digits(self) -> usize {
        match self {
            VersionType::ThreeDigits => 3,
            VersionType::FourDigits => 4,
        }
    }
}

impl FromStr for VersionType {
    type Err = ScmVersionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threedigits" | "three" | "3" => Ok(VersionType::ThreeDigits),
            "fourdigits" | "four" | "4" => Ok(VersionType::FourDigits),
            _ => Err(ScmVersionError::config(format!(
                "Invalid version type '{}', possible values: threeDigits, fourDigits",
                s
            ))),
        }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionType::ThreeDigits => write!(f, "threeDigits"),
            VersionType::FourDigits => write!(f, "fourDigits"),
        }
    }
}

/// Position of a numeric version component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitPos {
    Major,
    Minor,
    Patch,
    Hotfix,
}

impl DigitPos {
    pub fn index(self) -> usize {
        match self {
            DigitPos::Major => 0,
            DigitPos::Minor => 1,
            DigitPos::Patch => 2,
            DigitPos::Hotfix => 3,
        }
    }
}

impl FromStr for DigitPos {
    type Err = ScmVersionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAJOR" => Ok(DigitPos::Major),
            "MINOR" => Ok(DigitPos::Minor),
            "PATCH" => Ok(DigitPos::Patch),
            "HOTFIX" => Ok(DigitPos::Hotfix),
            _ => Err(ScmVersionError::config(format!(
                "Invalid increment '{}', possible values: MAJOR, MINOR, PATCH, HOTFIX",
                s
            ))),
        }
    }
}

/// Version with three or four numeric components and optional metadata.
///
/// The text form is `major.minor.patch[.hotfix][-branch][-build]`. Ordering
/// compares the numeric components first; metadata only breaks ties, and a
/// version without build metadata sorts above the same version with it.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    numbers: [u32; 4],
    version_type: VersionType,
    branch_metadata: Option<String>,
    build_metadata: Option<String>,
}

impl SemanticVersion {
    /// The zero version for a version type
    pub fn zero(version_type: VersionType) -> Self {
        SemanticVersion {
            numbers: [0; 4],
            version_type,
            branch_metadata: None,
            build_metadata: None,
        }
    }

    /// `major.0.0[.0]`
    pub fn for_integers(major: u32, version_type: VersionType) -> Self {
        let mut version = Self::zero(version_type);
        version.numbers[0] = major;
        version
    }

    /// Parses a full version string, inferring the version type from the
    /// number of components (up to three components are padded to three).
    pub fn parse(s: &str) -> Result<Self> {
        let (numbers, count, meta) = split_normal(s)?;
        let version_type = if count > 3 {
            VersionType::FourDigits
        } else {
            VersionType::ThreeDigits
        };
        let (branch_metadata, build_metadata) = split_metadata(meta);
        Ok(SemanticVersion {
            numbers,
            version_type,
            branch_metadata,
            build_metadata,
        })
    }

    /// Parses a possibly shortened version string (`7.2`, `7.2-feature`) and
    /// pads it to the requested version type.
    pub fn parse_as(s: &str, version_type: VersionType) -> Result<Self> {
        let (numbers, count, meta) = split_normal(s)?;
        if count > version_type.digits() {
            return Err(ScmVersionError::parse(format!(
                "'{}' has more than {} components",
                s,
                version_type.digits()
            )));
        }
        let (branch_metadata, build_metadata) = split_metadata(meta);
        Ok(SemanticVersion {
            numbers,
            version_type,
            branch_metadata,
            build_metadata,
        })
    }

    /// Like [parse_as](Self::parse_as) for a version taken from a branch
    /// name or a ref of that branch. A leading `feature` in the metadata is
    /// always branch metadata, whatever it looks like.
    pub fn parse_for_branch(s: &str, version_type: VersionType, feature: &str) -> Result<Self> {
        let mut version = Self::parse_as(s, version_type)?;
        if feature.is_empty() {
            return Ok(version);
        }
        let (_, _, meta) = split_normal(s)?;
        if let Some(rest) = meta.strip_prefix(feature) {
            if rest.is_empty() || rest.starts_with(METADATA_SEPARATOR) {
                version.branch_metadata = Some(feature.to_string());
                version.build_metadata = non_empty(rest.trim_start_matches(METADATA_SEPARATOR));
            }
        }
        Ok(version)
    }

    pub fn version_type(&self) -> VersionType {
        self.version_type
    }

    pub fn major(&self) -> u32 {
        self.numbers[0]
    }

    pub fn minor(&self) -> u32 {
        self.numbers[1]
    }

    pub fn patch(&self) -> u32 {
        self.numbers[2]
    }

    pub fn hotfix(&self) -> u32 {
        self.numbers[3]
    }

    /// Numeric components, sized to the version type
    pub fn components(&self) -> &[u32] {
        &self.numbers[..self.version_type.digits()]
    }

    pub fn branch_metadata(&self) -> Option<&str> {
        self.branch_metadata.as_deref()
    }

    pub fn build_metadata(&self) -> Option<&str> {
        self.build_metadata.as_deref()
    }

    /// `major.minor.patch[.hotfix]` without metadata
    pub fn normal_version(&self) -> String {
        join_components(self.components())
    }

    /// Copy with the branch metadata replaced; an empty value removes it.
    pub fn with_branch_metadata(&self, metadata: &str) -> Self {
        let mut version = self.clone();
        version.branch_metadata = non_empty(metadata);
        version
    }

    /// Copy with the build metadata replaced; an empty value removes it.
    pub fn with_build_metadata(&self, metadata: &str) -> Self {
        let mut version = self.clone();
        version.build_metadata = non_empty(metadata);
        version
    }

    /// Bumps `pos` and zeroes every lower component. Positions beyond the
    /// version type bump the lowest component. Build metadata is dropped.
    pub fn increment(&self, pos: DigitPos) -> Self {
        let digits = self.version_type.digits();
        let idx = pos.index().min(digits - 1);
        let mut version = self.clone();
        version.numbers[idx] = version.numbers[idx].saturating_add(1);
        for n in version.numbers.iter_mut().skip(idx + 1) {
            *n = 0;
        }
        version.build_metadata = None;
        version
    }

    /// Bumps the lowest component of the version type (patch or hotfix).
    pub fn increment_version(&self) -> Self {
        self.increment(DigitPos::Hotfix)
    }

    /// Bumps the rightmost non-zero component, so `7.2.0` becomes `7.3.0`
    /// and `7.0.0` becomes `8.0.0`.
    pub fn increment_latest(&self) -> Self {
        let digits = self.version_type.digits();
        let idx = self.numbers[..digits]
            .iter()
            .rposition(|n| *n != 0)
            .unwrap_or(digits - 1);
        let pos = match idx {
            0 => DigitPos::Major,
            1 => DigitPos::Minor,
            2 => DigitPos::Patch,
            _ => DigitPos::Hotfix,
        };
        self.increment(pos)
    }

    /// Bumps the trailing counter of the build metadata (`rc1` → `rc2`,
    /// `dev.4` → `dev.5`). Metadata without a counter gets `1` appended.
    pub fn increment_build_metadata(&self) -> Self {
        let Some(meta) = self.build_metadata.as_deref() else {
            return self.clone();
        };
        let head_len = meta.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (head, counter) = meta.split_at(head_len);
        let next = match counter.parse::<u64>() {
            Ok(n) => format!("{}{}", head, n + 1),
            Err(_) => format!("{}1", meta),
        };
        self.with_build_metadata(&next)
    }

    /// Renders the first `digits` components plus branch metadata, the form
    /// used for stabilization and feature branch names.
    pub fn to_string_for(&self, digits: usize) -> String {
        let n = digits.clamp(1, self.version_type.digits());
        let mut s = join_components(&self.numbers[..n]);
        if let Some(branch) = &self.branch_metadata {
            s.push_str(METADATA_SEPARATOR);
            s.push_str(branch);
        }
        s
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normal_version())?;
        if let Some(branch) = &self.branch_metadata {
            write!(f, "{}{}", METADATA_SEPARATOR, branch)?;
        }
        if let Some(build) = &self.build_metadata {
            write!(f, "{}{}", METADATA_SEPARATOR, build)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = ScmVersionError;

    fn from_str(s: &str) -> Result<Self> {
        SemanticVersion::parse(s)
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers
            .cmp(&other.numbers)
            .then_with(|| self.branch_metadata.cmp(&other.branch_metadata))
            .then_with(|| compare_build(&self.build_metadata, &other.build_metadata))
            .then_with(|| self.version_type.cmp(&other.version_type))
    }
}

fn compare_build(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let (a_head, a_counter) = split_counter(a);
            let (b_head, b_counter) = split_counter(b);
            a_head
                .cmp(b_head)
                .then_with(|| a_counter.cmp(&b_counter))
                .then_with(|| a.cmp(b))
        }
    }
}

fn split_counter(meta: &str) -> (&str, Option<u64>) {
    let head_len = meta.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (head, counter) = meta.split_at(head_len);
    (head, counter.parse().ok())
}

fn split_normal(s: &str) -> Result<([u32; 4], usize, &str)> {
    let s = s.trim();
    let end = s.find(METADATA_SEPARATOR).unwrap_or(s.len());
    let (normal, rest) = s.split_at(end);
    if normal.is_empty() {
        return Err(ScmVersionError::parse(format!("'{}' is not a version", s)));
    }

    let parts: Vec<&str> = normal.split('.').collect();
    if parts.len() > 4 {
        return Err(ScmVersionError::parse(format!(
            "'{}' has more than four components",
            s
        )));
    }

    let mut numbers = [0u32; 4];
    for (i, part) in parts.iter().enumerate() {
        numbers[i] = part.parse::<u32>().map_err(|_| {
            ScmVersionError::parse(format!("Invalid version component '{}' in '{}'", part, s))
        })?;
    }

    let meta = rest.strip_prefix(METADATA_SEPARATOR).unwrap_or(rest);
    Ok((numbers, parts.len(), meta))
}

fn split_metadata(meta: &str) -> (Option<String>, Option<String>) {
    if meta.is_empty() {
        return (None, None);
    }
    if let Some(i) = meta.rfind(METADATA_SEPARATOR) {
        let tail = &meta[i + 1..];
        if is_build_metadata(tail) {
            return (non_empty(&meta[..i]), non_empty(tail));
        }
    }
    if is_build_metadata(meta) {
        (None, Some(meta.to_string()))
    } else {
        (Some(meta.to_string()), None)
    }
}

/// Whether a metadata segment is build metadata rather than a branch name:
/// `SNAPSHOT`, a revision extension, or a counter such as `rc1` or `dev.2`.
pub fn is_build_metadata(segment: &str) -> bool {
    if segment == SNAPSHOT || segment.starts_with("rev.id.") {
        return true;
    }
    let alpha_len = segment
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(segment.len());
    if alpha_len == 0 {
        return false;
    }
    let rest = &segment[alpha_len..];
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn join_components(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
