//! Filesystem access for the scanner and the archive reader.
//!
//! Everything that touches a library root goes through a [`StorageBackend`]
//! so scans can be exercised against an in-memory tree in tests (enable the
//! `mock` feature for [`MockBackend`](backend::MockBackend)).

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{Entry, EntryKind};
pub use crate::path::{join_within, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
