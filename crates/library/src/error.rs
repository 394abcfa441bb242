//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a library failure.
///
/// ### Operational Errors
/// - [`ErrorKind::AlreadyRunning`]
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::NoPageSource`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]
/// - [`ErrorKind::Pages`]
/// - [`ErrorKind::Scan`] and [`ErrorKind::Merge`] wrap whichever of the
///   above interrupted the pass.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Another scan of the same data source hasn't finished yet.
    #[display("a scan of data source {_0} is already running")]
    AlreadyRunning(#[error(not(source))] i64),
    #[display("{_0} not found")]
    NotFound(#[error(not(source))] String),
    /// Reading page listings was requested without a page source.
    #[display("no page source configured")]
    NoPageSource,
    /// The catalog store rejected a read or write.
    #[display("catalog error")]
    Catalog,
    /// The page source could not list an item's pages.
    #[display("page source error")]
    Pages,
    #[display("scan failed")]
    Scan,
    #[display("merge failed")]
    Merge,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyRunning(_))
    }
}
