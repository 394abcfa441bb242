use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use folio_catalog::Repository;
use std::path::PathBuf;
use std::sync::Arc;

pub type LocatorHandle = Arc<dyn ArchiveLocator + Send + Sync>;

/// Finds the archive file behind a disk item id.
#[async_trait]
pub trait ArchiveLocator: Send + Sync {
    /// `None` when the catalog has no such item.
    async fn locate(&self, item_id: i64) -> Result<Option<PathBuf>>;
}

#[async_trait]
impl ArchiveLocator for Repository {
    async fn locate(&self, item_id: i64) -> Result<Option<PathBuf>> {
        let item = self.get_disk_item(item_id).await.or_raise(|| ErrorKind::Catalog)?;
        Ok(item.map(|item| item.path))
    }
}
