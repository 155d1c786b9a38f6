pub mod changelog;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod git;
pub mod previous;
pub mod release;
pub mod resolver;
pub mod ui;
pub mod warning;

pub use error::{Result, ScmVersionError};
