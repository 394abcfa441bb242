use crate::error::{ErrorKind, Result};
use crate::guard::ScanGuard;
use crate::merge::{self, MergeReport};
use crate::scan::hooks::store_file_source;
use crate::scan::{ScanReport, Scanner};
use crate::search::{SearchIndex, TitleIndex};
use exn::{OptionExt, ResultExt};
use folio_catalog::Repository;
use folio_matcher::models::{DataSource, MetadataData};
use folio_matcher::provider::ProviderHandle;
use folio_reader::{PageSourceHandle, page_metadata};
use folio_storage::BackendHandle;

/// Entry point for everything that changes the catalog.
///
/// Cheap to clone; clones share the scan guard and the search index.
#[derive(Clone)]
pub struct Library {
    repo: Repository,
    backend: BackendHandle,
    provider: Option<ProviderHandle>,
    pages: Option<PageSourceHandle>,
    guard: ScanGuard,
    search: SearchIndex,
}

impl Library {
    pub fn new(repo: Repository, backend: BackendHandle) -> Self {
        Self {
            repo,
            backend,
            provider: None,
            pages: None,
            guard: ScanGuard::default(),
            search: SearchIndex::default(),
        }
    }

    /// Consult `provider` for collection metadata during scans.
    pub fn with_provider(mut self, provider: ProviderHandle) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Read page geometry through `pages`, during scans for items that have
    /// none yet and on demand with [`refresh_item_pages`](Self::refresh_item_pages).
    pub fn with_page_source(mut self, pages: PageSourceHandle) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.search
    }

    /// Create the data source, or bring the stored one with the same name in
    /// line with it.
    pub async fn ensure_data_source(&self, source: &DataSource) -> Result<DataSource> {
        let existing = self.repo.get_data_source_by_name(&source.name).await.or_raise(|| ErrorKind::Catalog)?;
        match existing {
            Some(existing) => {
                let wanted = DataSource { id: existing.id, ..source.clone() };
                if wanted != existing {
                    self.repo.update_data_source(&wanted).await.or_raise(|| ErrorKind::Catalog)?;
                    tracing::info!(name = %wanted.name, "Updated data source");
                }
                Ok(wanted)
            },
            None => {
                let created = self.repo.create_data_source(source).await.or_raise(|| ErrorKind::Catalog)?;
                tracing::info!(name = %created.name, id = created.id, "Created data source");
                Ok(created)
            },
        }
    }

    /// Scan one data source, merge, and rebuild the search index.
    ///
    /// Fails with [`ErrorKind::AlreadyRunning`] straight away when the same
    /// data source is being scanned already.
    pub async fn scan(&self, data_source_id: i64) -> Result<ScanReport> {
        let source = self
            .repo
            .get_data_source(data_source_id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(format!("data source {data_source_id}")))?;
        self.scan_source(&source).await
    }

    pub async fn scan_by_name(&self, name: &str) -> Result<ScanReport> {
        let source = self
            .repo
            .get_data_source_by_name(name)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(format!("data source '{name}'")))?;
        self.scan_source(&source).await
    }

    async fn scan_source(&self, source: &DataSource) -> Result<ScanReport> {
        let Some(_permit) = self.guard.try_acquire(source.id) else {
            tracing::warn!(data_source = %source.name, "Scan already running");
            exn::bail!(ErrorKind::AlreadyRunning(source.id));
        };
        let scanner = Scanner {
            repo: &self.repo,
            backend: &self.backend,
            matcher: source.family.matcher(self.provider.clone()),
            pages: self.pages.as_ref(),
        };
        let mut report = scanner.scan(source).await.or_raise(|| ErrorKind::Scan)?;
        report.merge = self.merge().await.or_raise(|| ErrorKind::Scan)?;
        Ok(report)
    }

    pub fn is_scanning(&self, data_source_id: i64) -> bool {
        self.guard.is_running(data_source_id)
    }

    /// Promote disk records into the canonical catalog and publish a fresh
    /// search index.
    pub async fn merge(&self) -> Result<MergeReport> {
        let report = merge::merge(&self.repo).await.or_raise(|| ErrorKind::Merge)?;
        self.rebuild_search_index().await?;
        Ok(report)
    }

    pub async fn rebuild_search_index(&self) -> Result<()> {
        let collections = self.repo.list_collections().await.or_raise(|| ErrorKind::Catalog)?;
        self.search.publish(TitleIndex::build(&collections));
        Ok(())
    }

    /// Collection ids whose titles match every token of `query`.
    pub fn search(&self, query: &str) -> Vec<i64> {
        self.search.search(query)
    }

    /// Re-read the page geometry of one disk item, store it as the item's
    /// `file` source and merge it into the canonical item.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_item_pages(&self, disk_item_id: i64) -> Result<MetadataData> {
        let pages = self.pages.as_ref().ok_or_raise(|| ErrorKind::NoPageSource)?;
        let mut item = self
            .repo
            .get_disk_item(disk_item_id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(format!("disk item {disk_item_id}")))?;
        let data = page_metadata(pages.as_ref(), disk_item_id).await.or_raise(|| ErrorKind::Pages)?;
        store_file_source(&mut item, data.clone());
        self.repo.update_disk_item(&item).await.or_raise(|| ErrorKind::Catalog)?;
        self.merge().await?;
        Ok(data)
    }

    /// Merge a disk collection into the canonical collection at `content_uri`
    /// instead of its own, or undo that with `None`.
    pub async fn set_content_uri_override(&self, disk_collection_id: i64, content_uri: Option<&str>) -> Result<()> {
        self.repo
            .set_content_uri_override(disk_collection_id, content_uri)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        self.merge().await?;
        Ok(())
    }

    pub async fn set_collection_name_override(&self, collection_id: i64, name: Option<&str>) -> Result<()> {
        self.repo
            .set_collection_name_override(collection_id, name)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        self.rebuild_search_index().await
    }
}
