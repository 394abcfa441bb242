use super::ScanReport;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_catalog::Repository;
use folio_matcher::Matcher;
use folio_matcher::models::{DiskCollection, DiskItem, MetadataData, SourceError, source_mut};
use folio_reader::{PageSource, page_metadata};
use time::UtcDateTime;

/// Name of the metadata source holding the page list read from the archive.
pub(crate) const FILE_SOURCE: &str = "file";

const HOOK_ERROR: &str = "HookError";

/// Run the matcher's update hooks for one collection and persist whatever
/// they changed.
///
/// A failing hook doesn't fail the scan: the error is recorded on the
/// collection's source named after the matcher family, and cleared again by
/// the next successful run.
pub(super) async fn run(
    repo: &Repository,
    matcher: &dyn Matcher,
    collection: &mut DiskCollection,
    report: &mut ScanReport,
) -> Result<()> {
    let family = matcher.family();
    let before = collection.clone();
    let mut failure = None;

    if let Err(err) = matcher.update_collection(collection).await {
        tracing::warn!(uri = %collection.content_uri, error = ?err, "Collection update hook failed");
        failure = Some((*err).to_string());
    }

    let mut items = repo.list_disk_items(collection.id).await.or_raise(|| ErrorKind::Catalog)?;
    let original = items.clone();
    if let Err(err) = matcher.update_items(collection, &mut items).await {
        tracing::warn!(uri = %collection.content_uri, error = ?err, "Item update hook failed");
        failure.get_or_insert_with(|| (*err).to_string());
    }

    match failure {
        Some(message) => {
            report.hook_failures += 1;
            source_mut(&mut collection.sources, family.as_str()).error = Some(SourceError::new(HOOK_ERROR, message));
        },
        None => {
            if let Some(source) = collection.sources.iter_mut().find(|s| s.name == family.as_str()) {
                source.error = None;
            }
        },
    }

    for (item, original) in items.iter().zip(&original) {
        if item != original {
            repo.update_disk_item(item).await.or_raise(|| ErrorKind::Catalog)?;
            report.items_refreshed += 1;
        }
    }
    if *collection != before {
        repo.update_disk_collection(collection).await.or_raise(|| ErrorKind::Catalog)?;
        report.collections_refreshed += 1;
    }
    Ok(())
}

/// Fill the `file` source of every item of the collection that lacks one.
/// Items whose pages can't be read are logged and retried by the next scan.
pub(super) async fn page_geometry(
    repo: &Repository,
    pages: &dyn PageSource,
    collection: &DiskCollection,
    report: &mut ScanReport,
) -> Result<()> {
    let items = repo.list_disk_items(collection.id).await.or_raise(|| ErrorKind::Catalog)?;
    for mut item in items.into_iter().filter(|item| !has_file_source(item)) {
        match page_metadata(pages, item.id).await {
            Ok(data) => {
                store_file_source(&mut item, data);
                repo.update_disk_item(&item).await.or_raise(|| ErrorKind::Catalog)?;
                report.items_refreshed += 1;
            },
            Err(err) => {
                tracing::warn!(uri = %item.content_uri, id = item.id, error = ?err, "Could not read page metadata");
            },
        }
    }
    Ok(())
}

fn has_file_source(item: &DiskItem) -> bool {
    item.sources.iter().any(|s| s.name == FILE_SOURCE)
}

pub(crate) fn store_file_source(item: &mut DiskItem, data: MetadataData) {
    let source = source_mut(&mut item.sources, FILE_SOURCE);
    source.data = data;
    source.error = None;
    source.updated_at = Some(UtcDateTime::now().unix_timestamp());
}
