//! Coordinator messaging.
//!
//! Exactly one process (the coordinator) owns process-wide resources such as
//! the archive cache. Every other process reaches them through a [`Client`]
//! connected to the coordinator's socket; [`RemoteFn`] hides which of the two
//! situations the caller is in.
//!
//! Messages are newline-delimited JSON [`Envelope`]s over any bidirectional
//! byte stream.

mod client;
mod coordinator;
mod envelope;
pub mod error;
mod remote;

pub use crate::client::Client;
pub use crate::coordinator::Coordinator;
pub use crate::envelope::{Envelope, RemoteError};
pub use crate::remote::{DEFAULT_TIMEOUT, RemoteFn};
