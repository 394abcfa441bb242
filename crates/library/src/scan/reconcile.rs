use super::ScanReport;
use super::discover::Discovered;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_catalog::Repository;
use folio_matcher::models::{DataSource, DiskCollection, DiskItem, SortKey};
use folio_matcher::{MatchedItem, Matcher};
use folio_storage::Entry;
use std::collections::{HashMap, HashSet};

/// Bring the data source's disk collections in line with what was
/// discovered. Returns the live collections with their directory listings.
pub(super) async fn collections(
    repo: &Repository,
    source: &DataSource,
    discovered: Vec<Discovered>,
    report: &mut ScanReport,
) -> Result<Vec<(DiskCollection, Vec<Entry>)>> {
    let mut persisted = repo
        .list_disk_collections(source.id)
        .await
        .or_raise(|| ErrorKind::Catalog)?
        .into_iter()
        .map(|collection| (collection.content_uri.clone(), collection))
        .collect::<HashMap<_, _>>();

    let mut live = Vec::with_capacity(discovered.len());
    for found in discovered {
        let collection = match persisted.remove(&found.matched.content_uri) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.path = found.path;
                updated.name = found.matched.default_name;
                updated.cover_path = found.matched.cover_path;
                updated.missing = false;
                if updated != existing {
                    repo.update_disk_collection(&updated).await.or_raise(|| ErrorKind::Catalog)?;
                    match existing.missing {
                        true => {
                            tracing::info!(uri = %updated.content_uri, "Collection found again");
                            report.collections_restored += 1;
                        },
                        false => report.collections_updated += 1,
                    }
                }
                updated
            },
            None => {
                let mut created = DiskCollection {
                    id: 0,
                    data_source_id: source.id,
                    content_uri: found.matched.content_uri,
                    content_uri_override: None,
                    name: found.matched.default_name,
                    path: found.path,
                    cover_path: found.matched.cover_path,
                    missing: false,
                    kind: source.family,
                    sources: Vec::new(),
                };
                created.id = repo.insert_disk_collection(&created).await.or_raise(|| ErrorKind::Catalog)?;
                tracing::info!(uri = %created.content_uri, path = %created.path.display(), "New collection");
                report.collections_created += 1;
                created
            },
        };
        live.push((collection, found.entries));
    }

    // Whatever wasn't claimed by a discovered directory has gone away.
    for mut gone in persisted.into_values().filter(|c| !c.missing) {
        gone.missing = true;
        repo.update_disk_collection(&gone).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(uri = %gone.content_uri, path = %gone.path.display(), "Collection missing");
        report.collections_missing += 1;
    }

    Ok(live)
}

/// Bring the disk items of one live collection in line with its listing.
pub(super) async fn items(
    repo: &Repository,
    matcher: &dyn Matcher,
    collection: &DiskCollection,
    entries: &[Entry],
    report: &mut ScanReport,
) -> Result<()> {
    let mut persisted = repo
        .list_disk_items(collection.id)
        .await
        .or_raise(|| ErrorKind::Catalog)?
        .into_iter()
        .map(|item| (item.content_uri.clone(), item))
        .collect::<HashMap<_, _>>();

    let mut seen = HashSet::new();
    for matched in matcher.list_items(collection, entries) {
        if !seen.insert(matched.content_uri.clone()) {
            tracing::warn!(uri = %matched.content_uri, path = %matched.path.display(), "Duplicate item, skipping");
            continue;
        }
        match persisted.remove(&matched.content_uri) {
            Some(existing) => update_item(repo, existing, matched, report).await?,
            None => create_item(repo, collection, matched, report).await?,
        }
    }

    for gone in persisted.into_values() {
        repo.delete_disk_item(gone.id).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(uri = %gone.content_uri, "Item removed");
        report.items_deleted += 1;
    }
    Ok(())
}

async fn update_item(repo: &Repository, existing: DiskItem, matched: MatchedItem, report: &mut ScanReport) -> Result<()> {
    let mut updated = existing.clone();
    updated.path = matched.path;
    if matched.cover_path.is_some() {
        updated.cover_path = matched.cover_path;
    }
    if updated != existing {
        repo.update_disk_item(&updated).await.or_raise(|| ErrorKind::Catalog)?;
        report.items_updated += 1;
    }
    Ok(())
}

async fn create_item(
    repo: &Repository,
    collection: &DiskCollection,
    matched: MatchedItem,
    report: &mut ScanReport,
) -> Result<()> {
    let item = DiskItem {
        id: 0,
        disk_collection_id: collection.id,
        content_uri: matched.content_uri,
        name: matched.default_name,
        path: matched.path,
        cover_path: matched.cover_path,
        // Filled in by the item update hook.
        sort_key: SortKey::default(),
        sources: Vec::new(),
    };
    let id = repo.insert_disk_item(&item).await.or_raise(|| ErrorKind::Catalog)?;
    tracing::debug!(uri = %item.content_uri, id, "New item");
    report.items_created += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_catalog::Database;
    use folio_matcher::{MatchedCollection, MatcherFamily};
    use std::path::{Path, PathBuf};

    /// Reports one item, `foo:c1`, with whatever cover it was built with.
    struct OneItem(Option<PathBuf>);

    #[async_trait]
    impl Matcher for OneItem {
        fn family(&self) -> MatcherFamily {
            MatcherFamily::Comic
        }

        fn check_is_collection(&self, _dir: &Path, _entries: &[Entry]) -> Option<MatchedCollection> {
            None
        }

        fn list_items(&self, collection: &DiskCollection, _entries: &[Entry]) -> Vec<MatchedItem> {
            vec![MatchedItem {
                content_uri: format!("{}:c1", collection.content_uri),
                default_name: "Chapter 1".to_string(),
                path: collection.path.join("c1.cbz"),
                cover_path: self.0.clone(),
            }]
        }

        async fn update_collection(&self, _collection: &mut DiskCollection) -> folio_matcher::error::Result<()> {
            Ok(())
        }

        async fn update_items(
            &self,
            _collection: &DiskCollection,
            _items: &mut [DiskItem],
        ) -> folio_matcher::error::Result<()> {
            Ok(())
        }
    }

    async fn fixture() -> (Repository, DiskCollection) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let source = repo
            .create_data_source(&DataSource {
                id: 0,
                name: "comics".to_string(),
                family: MatcherFamily::Comic,
                paths: vec![PathBuf::from("/library")],
            })
            .await
            .unwrap();
        let mut collection = DiskCollection {
            id: 0,
            data_source_id: source.id,
            content_uri: "foo".to_string(),
            content_uri_override: None,
            name: "Foo".to_string(),
            path: PathBuf::from("/library/Foo"),
            cover_path: None,
            missing: false,
            kind: MatcherFamily::Comic,
            sources: Vec::new(),
        };
        collection.id = repo.insert_disk_collection(&collection).await.unwrap();
        (repo, collection)
    }

    async fn reconcile(repo: &Repository, collection: &DiskCollection, cover: Option<&str>) -> (ScanReport, DiskItem) {
        let mut report = ScanReport::default();
        let matcher = OneItem(cover.map(PathBuf::from));
        items(repo, &matcher, collection, &[], &mut report).await.unwrap();
        let mut stored = repo.list_disk_items(collection.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        (report, stored.remove(0))
    }

    #[tokio::test]
    async fn test_item_cover_keeps_last_known() {
        let (repo, collection) = fixture().await;

        let (report, item) = reconcile(&repo, &collection, Some("/library/Foo/c1.jpg")).await;
        assert_eq!(report.items_created, 1);
        assert_eq!(item.cover_path.as_deref(), Some(Path::new("/library/Foo/c1.jpg")));

        // No cover this time: the stored one stays.
        let (report, again) = reconcile(&repo, &collection, None).await;
        assert_eq!(report.items_updated, 0);
        assert_eq!(again.id, item.id);
        assert_eq!(again.cover_path.as_deref(), Some(Path::new("/library/Foo/c1.jpg")));

        let (report, replaced) = reconcile(&repo, &collection, Some("/library/Foo/c1-alt.jpg")).await;
        assert_eq!(report.items_updated, 1);
        assert_eq!(replaced.id, item.id);
        assert_eq!(replaced.cover_path.as_deref(), Some(Path::new("/library/Foo/c1-alt.jpg")));
    }
}
