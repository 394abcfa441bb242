//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive file does not exist.
    #[display("archive not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Neither the file extension nor its contents identify a known format,
    /// or no available extractor handles the detected format.
    #[display("unsupported archive format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// Archive is corrupt or truncated. Don't retry with the same input.
    #[display("invalid or corrupted archive")]
    InvalidArchive,
    /// A native extraction tool exited with a non-zero exit code.
    #[display("{_0} exited with code: {_1}")]
    ToolFailed(#[error(not(source))] String, i32),
    /// A native extraction tool was killed by a signal.
    #[display("{_0} was terminated")]
    ToolKilled(#[error(not(source))] String),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::ToolKilled(_))
    }
}
