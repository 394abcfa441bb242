//! Matcher Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A matcher error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for matcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A metadata provider could not answer.
    #[display("metadata provider error: {_0}")]
    Provider(#[error(not(source))] String),
    /// An update hook failed for a collection or its items.
    #[display("update hook failed")]
    Hook,
    /// A value could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// Details about the parsing failure.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Providers are remote services; everything else is deterministic.
        matches!(self, Self::Provider(_))
    }
}
