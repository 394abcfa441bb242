//! Reader Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A reader error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Kinds are `Clone` because one extraction outcome is handed to every
/// caller that was waiting on it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown item, missing archive file, or a page that isn't listed.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The archive could not be unpacked. Not retried automatically.
    #[display("extraction failed: {_0}")]
    Extraction(#[error(not(source))] String),
    /// The coordinator did not answer in time.
    #[display("timed out waiting for the coordinator")]
    Timeout,
    /// The coordinator could not be reached or answered with garbage.
    #[display("coordinator error: {_0}")]
    Coordinator(#[error(not(source))] String),
    #[display("catalog error")]
    Catalog,
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Coordinator(_) | Self::Catalog)
    }

    /// Code carried across the coordinator connection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Extraction(_) => "extraction",
            Self::Timeout => "timeout",
            Self::Coordinator(_) => "coordinator",
            Self::Catalog => "catalog",
            Self::Io(_) => "io",
        }
    }

    /// The payload without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(m) | Self::Extraction(m) | Self::Coordinator(m) | Self::Io(m) => m.clone(),
            Self::Timeout | Self::Catalog => self.to_string(),
        }
    }

    /// Inverse of [`code()`](Self::code) for errors coming back from the
    /// coordinator.
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "not_found" => Self::NotFound(message),
            "extraction" => Self::Extraction(message),
            "timeout" => Self::Timeout,
            "catalog" => Self::Catalog,
            "io" => Self::Io(message),
            _ => Self::Coordinator(format!("{code}: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_survive_the_wire() {
        for kind in [
            ErrorKind::NotFound("item 4".to_string()),
            ErrorKind::Extraction("unzip exited with code: 9".to_string()),
            ErrorKind::Io("disk full".to_string()),
            ErrorKind::Timeout,
            ErrorKind::Catalog,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code(), kind.message()), kind);
        }
        assert_eq!(
            ErrorKind::from_code("unknown_function", "no handler".to_string()),
            ErrorKind::Coordinator("unknown_function: no handler".to_string())
        );
    }
}
