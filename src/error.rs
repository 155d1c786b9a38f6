use thiserror::Error;

/// Unified error type for scm-version operations
#[derive(Error, Debug)]
pub enum ScmVersionError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Parse(String),

    #[error("Release not found: {0}")]
    ReleaseNotFound(String),

    #[error("SCM operation failed: {0}")]
    ScmOperation(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Changelog generation failed: {0}")]
    Changelog(#[source] Box<ScmVersionError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in scm-version
pub type Result<T> = std::result::Result<T, ScmVersionError>;

impl ScmVersionError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ScmVersionError::Config(msg.into())
    }

    /// Create a version parsing error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        ScmVersionError::Parse(msg.into())
    }

    /// Create a release-not-found error for the requested version string
    pub fn release_not_found(msg: impl Into<String>) -> Self {
        ScmVersionError::ReleaseNotFound(msg.into())
    }

    /// Create an SCM operation error with context
    pub fn scm(msg: impl Into<String>) -> Self {
        ScmVersionError::ScmOperation(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ScmVersionError::RemoteUnavailable(msg.into())
    }

    /// Wrap any error as the cause of a failed changelog run
    pub fn changelog(cause: ScmVersionError) -> Self {
        ScmVersionError::Changelog(Box::new(cause))
    }
}
