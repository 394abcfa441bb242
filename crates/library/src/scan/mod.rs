//! Reconciling one data source's roots with the disk-level catalog.
//!
//! A scan runs strictly in phases:
//!
//! 1. **Discover** collection directories under every root path.
//! 2. **Reconcile collections**: new ones are created, vanished ones are
//!    flagged `missing` (never deleted), known ones are updated in place.
//! 3. **Reconcile items** of every live collection: new files are created,
//!    vanished ones deleted, known ones updated.
//! 4. **Update hooks**: the matcher refreshes sort keys and remote metadata,
//!    then page geometry is read for items lacking it (when a page source is
//!    available).
//!
//! Merging into the canonical catalog follows, driven by
//! [`Library::scan`](crate::Library::scan).

mod discover;
pub(crate) mod hooks;
mod reconcile;

use crate::error::Result;
use crate::merge::MergeReport;
use folio_catalog::Repository;
use folio_matcher::MatcherHandle;
use folio_matcher::models::DataSource;
use folio_reader::PageSourceHandle;
use folio_storage::BackendHandle;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// What one scan changed. Only writes that altered a stored field are
/// counted, so rescanning an untouched tree reports no changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub collections_discovered: usize,
    pub collections_created: usize,
    pub collections_updated: usize,
    /// Previously missing collections found again.
    pub collections_restored: usize,
    pub collections_missing: usize,
    pub items_created: usize,
    pub items_updated: usize,
    pub items_deleted: usize,
    /// Collections whose update hooks changed them.
    pub collections_refreshed: usize,
    /// Items whose update hooks or page geometry changed them.
    pub items_refreshed: usize,
    pub hook_failures: usize,
    pub merge: MergeReport,
}

impl ScanReport {
    /// Creates, updates and deletes made to the disk-level catalog.
    pub fn disk_changes(&self) -> usize {
        self.collections_created
            + self.collections_updated
            + self.collections_restored
            + self.collections_missing
            + self.items_created
            + self.items_updated
            + self.items_deleted
    }

    /// Every write made by the scan, including hooks and the merge.
    pub fn changes(&self) -> usize {
        self.disk_changes() + self.collections_refreshed + self.items_refreshed + self.merge.changes()
    }
}

impl Display for ScanReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "collections: {} found, {} created, {} updated, {} restored, {} missing",
            self.collections_discovered,
            self.collections_created,
            self.collections_updated,
            self.collections_restored,
            self.collections_missing,
        )?;
        writeln!(f, "items: {} created, {} updated, {} deleted", self.items_created, self.items_updated, self.items_deleted)?;
        writeln!(
            f,
            "hooks: {} collections, {} items refreshed, {} failures",
            self.collections_refreshed, self.items_refreshed, self.hook_failures,
        )?;
        write!(f, "merge: {}", self.merge)
    }
}

/// Collaborators of one scan.
pub(crate) struct Scanner<'a> {
    pub(crate) repo: &'a Repository,
    pub(crate) backend: &'a BackendHandle,
    pub(crate) matcher: MatcherHandle,
    pub(crate) pages: Option<&'a PageSourceHandle>,
}

impl Scanner<'_> {
    /// Phases 1 to 4. The caller holds the data source's scan permit.
    #[tracing::instrument(skip_all, fields(data_source = %source.name, id = source.id))]
    pub(crate) async fn scan(&self, source: &DataSource) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        let discovered = discover::discover(self.backend.as_ref(), self.matcher.as_ref(), &source.paths).await;
        report.collections_discovered = discovered.len();

        let live = reconcile::collections(self.repo, source, discovered, &mut report).await?;
        for (collection, entries) in &live {
            reconcile::items(self.repo, self.matcher.as_ref(), collection, entries, &mut report).await?;
        }

        for (mut collection, _) in live {
            hooks::run(self.repo, self.matcher.as_ref(), &mut collection, &mut report).await?;
            if let Some(pages) = self.pages {
                hooks::page_geometry(self.repo, pages.as_ref(), &collection, &mut report).await?;
            }
        }

        tracing::info!(
            discovered = report.collections_discovered,
            changes = report.disk_changes(),
            hook_failures = report.hook_failures,
            "Scan complete"
        );
        Ok(report)
    }
}
