//! Title search over canonical collections.
//!
//! The index is rebuilt wholesale after every merge and published through a
//! [`watch`] channel, so readers always see one complete version and never a
//! half-built one.

use folio_matcher::models::Collection;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedCollection {
    id: i64,
    name: String,
    /// Lowercased effective name followed by the merged alternate titles.
    titles: Vec<String>,
}

/// One immutable version of the search index.
#[derive(Debug, Default)]
pub struct TitleIndex {
    entries: Vec<IndexedCollection>,
}

impl TitleIndex {
    pub fn build<'a>(collections: impl IntoIterator<Item = &'a Collection>) -> Self {
        let mut entries = collections
            .into_iter()
            .map(|collection| {
                let name = collection.display_name().to_string();
                let mut titles = vec![name.to_lowercase()];
                for title in &collection.merged.titles {
                    let title = title.to_lowercase();
                    if !titles.contains(&title) {
                        titles.push(title);
                    }
                }
                IndexedCollection { id: collection.id, name, titles }
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        Self { entries }
    }

    /// Ids of the collections with a title containing every whitespace
    /// separated token of `query`, ordered by name. An empty query matches
    /// nothing.
    pub fn search(&self, query: &str) -> Vec<i64> {
        let tokens = query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>();
        if tokens.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| {
                entry.titles.iter().any(|title| tokens.iter().all(|token| title.contains(token.as_str())))
            })
            .map(|entry| entry.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to the latest [`TitleIndex`].
#[derive(Debug, Clone)]
pub struct SearchIndex {
    sender: Arc<watch::Sender<Arc<TitleIndex>>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(TitleIndex::default()));
        Self { sender: Arc::new(sender) }
    }

    pub fn current(&self) -> Arc<TitleIndex> {
        Arc::clone(&self.sender.borrow())
    }

    /// Notified every time a rebuilt index is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<TitleIndex>> {
        self.sender.subscribe()
    }

    pub fn publish(&self, index: TitleIndex) {
        tracing::debug!(collections = index.len(), "Publishing search index");
        self.sender.send_replace(Arc::new(index));
    }

    pub fn search(&self, query: &str) -> Vec<i64> {
        self.current().search(query)
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_matcher::MatcherFamily;
    use folio_matcher::models::MetadataData;
    use rstest::rstest;

    fn collection(id: i64, name: &str, name_override: Option<&str>, titles: &[&str]) -> Collection {
        Collection {
            id,
            content_uri: format!("c{id}"),
            name: name.to_string(),
            name_override: name_override.map(str::to_string),
            cover_path: None,
            kind: MatcherFamily::Comic,
            sources: Vec::new(),
            merged: MetadataData {
                titles: titles.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    fn index() -> TitleIndex {
        TitleIndex::build(&[
            collection(1, "Yotsuba&!", None, &["よつばと!"]),
            collection(2, "Example Vol. 2", Some("Another Example"), &[]),
            collection(3, "Blame!", None, &["Blame Academy"]),
            collection(4, "example", None, &[]),
        ])
    }

    #[rstest]
    #[case("example", vec![2, 4])]
    #[case("EXAMPLE another", vec![2])]
    #[case("vol. 2", vec![])]
    #[case("academy", vec![3])]
    #[case("よつば", vec![1])]
    #[case("blame yotsuba", vec![])]
    #[case("   ", vec![])]
    fn test_search(#[case] query: &str, #[case] expected: Vec<i64>) {
        assert_eq!(index().search(query), expected);
    }

    #[tokio::test]
    async fn test_publish_swaps_versions() {
        let search = SearchIndex::default();
        let mut updates = search.subscribe();
        let before = search.current();
        assert!(before.is_empty());

        search.publish(index());
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().len(), 4);
        assert_eq!(search.search("blame"), vec![3]);
        // Readers holding the old version keep it intact.
        assert!(before.is_empty());
    }
}
