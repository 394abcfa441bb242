//! CLI Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the catalog")]
    Catalog,
    #[display("library operation failed")]
    Library,
    /// The coordinator socket couldn't be bound or reached.
    #[display("coordinator unavailable")]
    Coordinator,
    #[display("could not read pages")]
    Pages,
    #[display("no data source named '{_0}'")]
    UnknownDataSource(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Coordinator)
    }
}
