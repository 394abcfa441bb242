use folio_matcher::{MatchedCollection, Matcher};
use folio_storage::{Entry, StorageBackend};
use std::collections::HashSet;
use std::path::PathBuf;

/// A directory the matcher accepted, with the listing it was judged on.
#[derive(Debug)]
pub(super) struct Discovered {
    pub(super) path: PathBuf,
    pub(super) matched: MatchedCollection,
    pub(super) entries: Vec<Entry>,
}

/// List the immediate subdirectories of every root and keep those the
/// matcher recognizes as collections.
///
/// Unreadable roots and directories are logged and skipped. When two
/// directories produce the same content URI the first one (roots in order,
/// directories by name) wins.
#[tracing::instrument(skip_all, fields(roots = roots.len()))]
pub(super) async fn discover(backend: &dyn StorageBackend, matcher: &dyn Matcher, roots: &[PathBuf]) -> Vec<Discovered> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
        let entries = match backend.list_dir(root).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = ?err, "Could not list root path, skipping");
                continue;
            },
        };
        for dir in entries.into_iter().filter(Entry::is_dir) {
            let children = match backend.list_dir(&dir.path).await {
                Ok(children) => children,
                Err(err) => {
                    tracing::warn!(path = %dir.path.display(), error = ?err, "Could not list directory, skipping");
                    continue;
                },
            };
            let Some(matched) = matcher.check_is_collection(&dir.path, &children) else {
                continue;
            };
            if !seen.insert(matched.content_uri.clone()) {
                tracing::warn!(
                    uri = %matched.content_uri,
                    path = %dir.path.display(),
                    "Another directory already claimed this content URI, skipping"
                );
                continue;
            }
            found.push(Discovered { path: dir.path, matched, entries: children });
        }
    }
    tracing::debug!(collections = found.len(), "Discovery complete");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_matcher::MatcherFamily;
    use folio_storage::backend::MockBackend;
    use std::path::Path;

    #[tokio::test]
    async fn test_first_directory_wins() {
        let backend = MockBackend::with_files([
            "/a/Foo [Digital]/ch1.cbz",
            "/a/Foo [Scan]/ch1.cbz",
            "/a/Notes/readme.txt",
            "/b/Bar/v01.zip",
            "/b/Foo/c2.cbz",
        ]);
        let matcher = MatcherFamily::Comic.matcher(None);
        let roots = [PathBuf::from("/a"), PathBuf::from("/missing"), PathBuf::from("/b")];
        let found = discover(&backend, matcher.as_ref(), &roots).await;

        let summary = found.iter().map(|d| (d.matched.content_uri.as_str(), d.path.as_path())).collect::<Vec<_>>();
        assert_eq!(summary, vec![("foo", Path::new("/a/Foo [Digital]")), ("bar", Path::new("/b/Bar"))]);
        assert_eq!(found[0].entries.len(), 1);
    }

    #[tokio::test]
    async fn test_files_at_root_are_ignored() {
        let backend = MockBackend::with_files(["/a/loose.cbz"]);
        let matcher = MatcherFamily::Comic.matcher(None);
        assert!(discover(&backend, matcher.as_ref(), &[PathBuf::from("/a")]).await.is_empty());
    }
}
