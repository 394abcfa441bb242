//! Keeping the catalog in step with the library on disk.
//!
//! [`Library`] is the entry point: it scans data sources (see [`scan`]),
//! promotes what was found into canonical collections and items (see
//! [`merge`]), and answers title searches from an in-memory [`SearchIndex`]
//! rebuilt after every merge.

mod context;
pub mod error;
mod guard;
pub mod merge;
pub mod scan;
pub mod search;

pub use crate::context::Library;
pub use crate::merge::{MergeReport, merge_metadata};
pub use crate::scan::ScanReport;
pub use crate::search::{SearchIndex, TitleIndex};
