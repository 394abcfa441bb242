use crate::consts::{COMIC_EXTENSIONS, COVER_FILENAMES};
use crate::error::Result;
use crate::matcher::{MatchedCollection, MatchedItem, Matcher, MatcherFamily};
use crate::models::{DiskCollection, DiskItem, SourceError, source_mut};
use crate::name::{NameData, clean_name, collection_uri, item_uri};
use crate::provider::ProviderHandle;
use async_trait::async_trait;
use folio_storage::Entry;
use std::path::Path;
use time::UtcDateTime;

/// Comics: a directory of `.cbz` archives, one per volume or chapter, with an
/// optional `cover.jpg` next to them.
pub struct ComicMatcher {
    provider: Option<ProviderHandle>,
}
impl ComicMatcher {
    pub fn new(provider: Option<ProviderHandle>) -> Self {
        Self { provider }
    }

    fn is_archive(entry: &Entry) -> bool {
        entry.is_file()
            && Path::new(&entry.name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| COMIC_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }

    fn is_cover(entry: &Entry) -> bool {
        entry.is_file() && COVER_FILENAMES.iter().any(|cover| cover.eq_ignore_ascii_case(&entry.name))
    }
}

#[async_trait]
impl Matcher for ComicMatcher {
    fn family(&self) -> MatcherFamily {
        MatcherFamily::Comic
    }

    fn check_is_collection(&self, dir: &Path, entries: &[Entry]) -> Option<MatchedCollection> {
        if !entries.iter().any(Self::is_archive) {
            return None;
        }
        let dir_name = dir.file_name()?.to_string_lossy();
        let Some(content_uri) = collection_uri(&dir_name) else {
            tracing::warn!(path = %dir.display(), "Directory name leaves nothing to identify the collection by");
            return None;
        };
        Some(MatchedCollection {
            content_uri,
            default_name: clean_name(&dir_name),
            cover_path: entries.iter().find(|e| Self::is_cover(e)).map(|e| e.path.clone()),
        })
    }

    fn list_items(&self, collection: &DiskCollection, entries: &[Entry]) -> Vec<MatchedItem> {
        entries
            .iter()
            .filter(|entry| Self::is_archive(entry))
            .filter_map(|entry| {
                let stem = Path::new(&entry.name).file_stem()?.to_string_lossy();
                let cleaned = clean_name(&stem);
                let data = NameData::parse(&cleaned);
                let Some(key) = data.key() else {
                    tracing::warn!(path = %entry.path.display(), "No volume or chapter found in file name; skipping");
                    return None;
                };
                Some(MatchedItem {
                    content_uri: item_uri(&collection.content_uri, &key),
                    default_name: data.display_name().unwrap_or(cleaned),
                    path: entry.path.clone(),
                    cover_path: None,
                })
            })
            .collect()
    }

    async fn update_collection(&self, collection: &mut DiskCollection) -> Result<()> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };
        let title = collection.name.clone();
        let source = source_mut(&mut collection.sources, provider.name());
        let remote_id = source.override_remote_id.clone().or_else(|| source.remote_id.clone());
        match provider.fetch(&title, remote_id.as_deref()).await {
            Ok(Some(found)) => {
                let mut data = found.data;
                // Providers are sloppy with dates; only keep plausible years.
                data.pub_year = data.pub_year.filter(|year| (1000..=9999).contains(year));
                source.remote_id = found.remote_id.or(remote_id);
                source.data = data;
                source.error = None;
            },
            Ok(None) => {
                tracing::debug!(provider = provider.name(), title = %title, "Metadata provider has no match");
                source.error = None;
            },
            Err(err) => {
                tracing::warn!(provider = provider.name(), title = %title, error = ?err, "Metadata lookup failed");
                source.error = Some(SourceError::new("ProviderError", (*err).to_string()));
            },
        }
        source.updated_at = Some(UtcDateTime::now().unix_timestamp());
        Ok(())
    }

    async fn update_items(&self, _collection: &DiskCollection, items: &mut [DiskItem]) -> Result<()> {
        for item in items.iter_mut() {
            item.sort_key = NameData::parse(&item.name).sort_key();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{MetadataData, SortKey};
    use crate::provider::{MetadataProvider, ProviderMatch};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn collection(uri: &str) -> DiskCollection {
        DiskCollection {
            id: 1,
            data_source_id: 1,
            content_uri: uri.to_string(),
            content_uri_override: None,
            name: "Example Vol. 2".to_string(),
            path: PathBuf::from("/library/Example Vol. 2 (Group)"),
            cover_path: None,
            missing: false,
            kind: MatcherFamily::Comic,
            sources: Vec::new(),
        }
    }

    fn item(name: &str) -> DiskItem {
        DiskItem {
            id: 0,
            disk_collection_id: 1,
            content_uri: String::new(),
            name: name.to_string(),
            path: PathBuf::new(),
            cover_path: None,
            sort_key: SortKey::default(),
            sources: Vec::new(),
        }
    }

    struct StaticProvider(std::result::Result<Option<ProviderMatch>, String>);

    #[async_trait]
    impl MetadataProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, _title: &str, _remote_id: Option<&str>) -> Result<Option<ProviderMatch>> {
            match &self.0 {
                Ok(found) => Ok(found.clone()),
                Err(message) => exn::bail!(ErrorKind::Provider(message.clone())),
            }
        }
    }

    #[test]
    fn test_check_is_collection() {
        let dir = Path::new("/library/Example Vol. 2 (Group)");
        let entries = vec![Entry::file(dir.join("Cover.JPG")), Entry::file(dir.join("ch1.cbz"))];
        let matched = ComicMatcher::new(None).check_is_collection(dir, &entries).unwrap();
        assert_eq!(matched.content_uri, "example-vol-2");
        assert_eq!(matched.default_name, "Example Vol. 2");
        assert_eq!(matched.cover_path, Some(dir.join("Cover.JPG")));
    }

    #[test]
    fn test_not_a_collection_without_archives() {
        let dir = Path::new("/library/Wallpapers");
        let entries = vec![Entry::file(dir.join("cover.jpg")), Entry::directory(dir.join("ch1.cbz"))];
        assert_eq!(ComicMatcher::new(None).check_is_collection(dir, &entries), None);
    }

    #[test]
    fn test_list_items() {
        let col = collection("example-vol-2");
        let dir = &col.path;
        let entries = vec![
            Entry::file(dir.join("ch1.cbz")),
            Entry::file(dir.join("Vol. 3 [Digital].zip")),
            Entry::file(dir.join("cover.jpg")),
            Entry::file(dir.join("Omake.cbz")),
        ];
        let items = ComicMatcher::new(None).list_items(&col, &entries);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_uri, "example-vol-2:c1");
        assert_eq!(items[0].default_name, "Chapter 1");
        assert_eq!(items[0].path, dir.join("ch1.cbz"));
        assert_eq!(items[1].content_uri, "example-vol-2:v3");
        assert_eq!(items[1].default_name, "Volume 3");
    }

    #[tokio::test]
    async fn test_update_items_sets_sort_keys() {
        let col = collection("example-vol-2");
        let mut items = vec![item("Chapter 1"), item("Volume 2"), item("Volume 1, Chapter 4")];
        ComicMatcher::new(None).update_items(&col, &mut items).await.unwrap();
        let keys: Vec<_> = items.iter().map(|i| i.sort_key.to_string()).collect();
        assert_eq!(keys, vec!["[1000000, 1]", "[2, 0]", "[1, 4]"]);
    }

    #[tokio::test]
    async fn test_update_collection_without_provider_is_noop() {
        let mut col = collection("example-vol-2");
        ComicMatcher::new(None).update_collection(&mut col).await.unwrap();
        assert!(col.sources.is_empty());
    }

    #[tokio::test]
    async fn test_update_collection_stores_provider_data() {
        let found = ProviderMatch {
            remote_id: Some("md-123".to_string()),
            data: MetadataData { authors: vec!["X".to_string()], pub_year: Some(19), ..Default::default() },
        };
        let provider: ProviderHandle = Arc::new(StaticProvider(Ok(Some(found))));
        let mut col = collection("example-vol-2");
        ComicMatcher::new(Some(provider)).update_collection(&mut col).await.unwrap();
        let source = &col.sources[0];
        assert_eq!(source.name, "static");
        assert_eq!(source.remote_id.as_deref(), Some("md-123"));
        assert_eq!(source.data.authors, vec!["X"]);
        assert_eq!(source.data.pub_year, None);
        assert!(source.updated_at.is_some());
        assert!(source.error.is_none());
    }

    #[tokio::test]
    async fn test_update_collection_records_provider_error() {
        let provider: ProviderHandle = Arc::new(StaticProvider(Err("rate limited".to_string())));
        let mut col = collection("example-vol-2");
        col.sources.push(crate::models::MetadataSource::new("static"));
        col.sources[0].data.description = Some("kept".to_string());
        ComicMatcher::new(Some(provider)).update_collection(&mut col).await.unwrap();
        let source = &col.sources[0];
        let error = source.error.as_ref().unwrap();
        assert_eq!(error.name, "ProviderError");
        assert!(error.message.contains("rate limited"));
        // Previously fetched data survives a failed refresh.
        assert_eq!(source.data.description.as_deref(), Some("kept"));
    }
}
