//! RPC Error Types

use derive_more::{Display, Error};

/// An RPC error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response arrived within the function's bound. The call is not
    /// retried; the remote side may still complete it.
    #[display("timed out waiting for '{_0}'")]
    Timeout(#[error(not(source))] String),
    /// The handler ran and reported a failure.
    #[display("remote '{code}' error: {message}")]
    Remote { code: String, message: String },
    /// The connection could not be opened or written to.
    #[display("transport error")]
    Transport,
    /// A message could not be encoded or decoded.
    #[display("malformed message")]
    Codec,
    /// The other end went away before answering.
    #[display("connection closed")]
    Disconnected,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Callers decide; nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Disconnected)
    }
}
