//! Promoting disk-level records into the canonical catalog.
//!
//! Every live [`DiskCollection`] maps onto the canonical [`Collection`] with
//! its effective content URI, and every disk item onto the canonical [`Item`]
//! with the same URI. Canonical records are created the first time they are
//! seen and never removed here. Their metadata sources are kept in sync with
//! the disk records by name, and the effective metadata is recomputed with
//! [`merge_metadata`] before anything is written.

mod metadata;

pub use self::metadata::merge_metadata;
pub(crate) use self::metadata::sync_sources;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_catalog::Repository;
use folio_matcher::models::{Collection, DiskCollection, DiskItem, Item, MetadataData};
use folio_matcher::parent_uri;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Counts of canonical records written by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub collections_created: usize,
    pub collections_updated: usize,
    pub items_created: usize,
    pub items_updated: usize,
    /// Disk items whose canonical collection couldn't be resolved.
    pub items_skipped: usize,
}
impl MergeReport {
    pub fn changes(&self) -> usize {
        self.collections_created + self.collections_updated + self.items_created + self.items_updated
    }
}
impl Display for MergeReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "collections: {} created, {} updated; items: {} created, {} updated, {} skipped",
            self.collections_created,
            self.collections_updated,
            self.items_created,
            self.items_updated,
            self.items_skipped,
        )
    }
}

/// Merge every live disk record of every data source.
///
/// A content URI is only unique within one data source, so several disk
/// records can share a canonical record. They are folded onto it in disk id
/// order and the result is written at most once.
#[tracing::instrument(skip_all)]
pub async fn merge(repo: &Repository) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    let disk_collections = repo.list_all_disk_collections().await.or_raise(|| ErrorKind::Catalog)?;
    let mut canonical = repo
        .list_collections()
        .await
        .or_raise(|| ErrorKind::Catalog)?
        .into_iter()
        .map(|collection| (collection.content_uri.clone(), collection))
        .collect::<HashMap<_, _>>();

    let mut collection_groups: BTreeMap<&str, Vec<&DiskCollection>> = BTreeMap::new();
    for disk in disk_collections.iter().filter(|c| !c.missing) {
        collection_groups.entry(disk.effective_uri()).or_default().push(disk);
    }
    for (uri, counterparts) in &collection_groups {
        merge_collection(repo, uri, counterparts, &mut canonical, &mut report).await?;
    }

    let owners = disk_collections.iter().map(|c| (c.id, c)).collect::<HashMap<i64, &DiskCollection>>();
    let mut items = HashMap::new();
    for collection in canonical.values() {
        for item in repo.list_items(collection.id).await.or_raise(|| ErrorKind::Catalog)? {
            items.insert(item.content_uri.clone(), item);
        }
    }

    let mut item_groups: BTreeMap<String, Vec<(&Collection, DiskItem)>> = BTreeMap::new();
    for disk_item in repo.list_all_disk_items().await.or_raise(|| ErrorKind::Catalog)? {
        let Some(owner) = owners.get(&disk_item.disk_collection_id).filter(|owner| !owner.missing) else {
            continue;
        };
        let Some(parent) = parent_collection(owner, &disk_item).and_then(|uri| canonical.get(uri)) else {
            tracing::warn!(item = %disk_item.content_uri, "No canonical collection for item, skipping");
            report.items_skipped += 1;
            continue;
        };
        item_groups.entry(disk_item.content_uri.clone()).or_default().push((parent, disk_item));
    }
    for (uri, counterparts) in &item_groups {
        merge_item(repo, uri, counterparts, &mut items, &mut report).await?;
    }

    tracing::info!(%report, "Merge complete");
    Ok(report)
}

/// The effective URI of the collection an item belongs to. Items of an
/// overridden disk collection follow it to the override.
fn parent_collection<'a>(owner: &'a DiskCollection, item: &'a DiskItem) -> Option<&'a str> {
    let parent = parent_uri(&item.content_uri)?;
    match parent == owner.content_uri {
        true => Some(owner.effective_uri()),
        false => Some(parent),
    }
}

fn fold_collection(collection: &mut Collection, counterparts: &[&DiskCollection]) {
    for disk in counterparts {
        sync_sources(&mut collection.sources, &disk.sources);
        if collection.cover_path.is_none() {
            collection.cover_path = disk.cover_path.clone();
        }
    }
    collection.merged = merge_metadata(&collection.sources);
}

async fn merge_collection(
    repo: &Repository,
    uri: &str,
    counterparts: &[&DiskCollection],
    canonical: &mut HashMap<String, Collection>,
    report: &mut MergeReport,
) -> Result<()> {
    let Some(first) = counterparts.first() else {
        return Ok(());
    };
    match canonical.get_mut(uri) {
        Some(existing) => {
            let mut updated = existing.clone();
            fold_collection(&mut updated, counterparts);
            if updated != *existing {
                repo.update_collection(&updated).await.or_raise(|| ErrorKind::Catalog)?;
                tracing::debug!(uri, id = updated.id, "Updated collection");
                report.collections_updated += 1;
                *existing = updated;
            }
        },
        None => {
            let mut collection = Collection {
                id: 0,
                content_uri: uri.to_string(),
                name: first.name.clone(),
                name_override: None,
                cover_path: None,
                kind: first.kind,
                sources: Vec::new(),
                merged: MetadataData::default(),
            };
            fold_collection(&mut collection, counterparts);
            collection.id = repo.insert_collection(&collection).await.or_raise(|| ErrorKind::Catalog)?;
            tracing::info!(uri, id = collection.id, "Created collection");
            report.collections_created += 1;
            canonical.insert(uri.to_string(), collection);
        },
    }
    Ok(())
}

fn fold_item(item: &mut Item, counterparts: &[(&Collection, DiskItem)]) {
    for (_, disk) in counterparts {
        sync_sources(&mut item.sources, &disk.sources);
        item.sort_key = disk.sort_key;
        if item.cover_path.is_none() {
            item.cover_path = disk.cover_path.clone();
        }
    }
    item.merged = merge_metadata(&item.sources);
}

async fn merge_item(
    repo: &Repository,
    uri: &str,
    counterparts: &[(&Collection, DiskItem)],
    items: &mut HashMap<String, Item>,
    report: &mut MergeReport,
) -> Result<()> {
    let Some((parent, first)) = counterparts.first() else {
        return Ok(());
    };
    match items.get_mut(uri) {
        Some(existing) => {
            let mut updated = existing.clone();
            fold_item(&mut updated, counterparts);
            if updated != *existing {
                repo.update_item(&updated).await.or_raise(|| ErrorKind::Catalog)?;
                report.items_updated += 1;
                *existing = updated;
            }
        },
        None => {
            let mut item = Item {
                id: 0,
                collection_id: parent.id,
                content_uri: uri.to_string(),
                name: first.name.clone(),
                cover_path: None,
                kind: parent.kind,
                sort_key: first.sort_key,
                sources: Vec::new(),
                merged: MetadataData::default(),
            };
            fold_item(&mut item, counterparts);
            item.id = repo.insert_item(&item).await.or_raise(|| ErrorKind::Catalog)?;
            tracing::debug!(uri, id = item.id, "Created item");
            report.items_created += 1;
            items.insert(item.content_uri.clone(), item);
        },
    }
    Ok(())
}
