//! Domain logic - pure versioning rules independent of the repository backend

pub mod branch;
pub mod naming;
pub mod version;

pub use branch::{classify, BranchInfo, BranchKind};
pub use naming::NamingConfig;
pub use version::{DigitPos, SemanticVersion, VersionType, SNAPSHOT};
