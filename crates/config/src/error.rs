//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// All of them mean the configuration has to be fixed by hand.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist.
    #[display("config file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// The merged configuration could not be deserialized.
    #[display("invalid configuration")]
    Invalid,
    #[display("{key} must be an absolute path: {}", path.display())]
    RelativeSetting { key: &'static str, path: PathBuf },
    #[display("data source '{name}' has a relative path: {}", path.display())]
    RelativePath { name: String, path: PathBuf },
    #[display("data source '{_0}' is configured more than once")]
    DuplicateDataSource(#[error(not(source))] String),
    #[display("data source '{_0}' has no paths")]
    NoPaths(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
