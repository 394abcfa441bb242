//! Catalog models shared by the scanner, the merger and the catalog store.
//!
//! Disk-level entities ([`DiskCollection`], [`DiskItem`]) mirror what a scan
//! last saw on the filesystem. Canonical entities ([`Collection`], [`Item`])
//! are the long-lived records readers interact with; they are keyed by the
//! same content URIs but never removed by a scan.
//!
//! Entities that have not been persisted yet carry an `id` of `0`.

mod metadata;
mod sort;

pub use self::metadata::{MetadataData, MetadataSource, PageInfo, PubStatus, ReadingMode, SourceError, source_mut};
pub use self::sort::SortKey;
use crate::MatcherFamily;
use std::path::PathBuf;

/// A named set of library roots scanned with one matcher family.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub family: MatcherFamily,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskCollection {
    pub id: i64,
    pub data_source_id: i64,
    /// Unique within the owning data source.
    pub content_uri: String,
    /// Administrator supplied URI used instead of `content_uri` when merging.
    pub content_uri_override: Option<String>,
    pub name: String,
    pub path: PathBuf,
    pub cover_path: Option<PathBuf>,
    /// Soft-deleted: the directory wasn't found by the latest scan.
    pub missing: bool,
    pub kind: MatcherFamily,
    pub sources: Vec<MetadataSource>,
}
impl DiskCollection {
    /// The URI of the canonical [`Collection`] this merges into.
    pub fn effective_uri(&self) -> &str {
        self.content_uri_override.as_deref().unwrap_or(&self.content_uri)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskItem {
    pub id: i64,
    pub disk_collection_id: i64,
    /// Always `<collection content uri>:<key>`.
    pub content_uri: String,
    pub name: String,
    pub path: PathBuf,
    pub cover_path: Option<PathBuf>,
    pub sort_key: SortKey,
    pub sources: Vec<MetadataSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: i64,
    pub content_uri: String,
    pub name: String,
    pub name_override: Option<String>,
    pub cover_path: Option<PathBuf>,
    pub kind: MatcherFamily,
    pub sources: Vec<MetadataSource>,
    pub merged: MetadataData,
}
impl Collection {
    pub fn display_name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub collection_id: i64,
    pub content_uri: String,
    pub name: String,
    pub cover_path: Option<PathBuf>,
    pub kind: MatcherFamily,
    pub sort_key: SortKey,
    pub sources: Vec<MetadataSource>,
    pub merged: MetadataData,
}
