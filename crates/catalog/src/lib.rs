//! SQLite catalog for folio.
//!
//! The catalog holds two layers. The disk layer (disk collections and disk
//! items, grouped by data source) is rewritten by every scan to mirror the
//! filesystem. The canonical layer (collections and items) is keyed by content
//! URI, shared across data sources and only ever grows; it carries merged
//! metadata and administrator overrides.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::Repository;
