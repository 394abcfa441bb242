//! In-memory storage backend for testing.

use super::PathStream;
use crate::error::{ErrorKind, Result};
use crate::path::{absolute, validate as validate_path};
use crate::{Entry, EntryKind, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Holds a set of absolute file paths behind a [`RwLock`]; directories exist
/// implicitly whenever a file lives beneath them. Ideal for scanner tests
/// that need a library tree without touching the filesystem.
///
/// # Examples
///
/// ```
/// use folio_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files(["/library/Series/ch1.cbz"]);
/// let entries = backend.list_dir(Path::new("/library")).await?;
/// assert_eq!(entries[0].name, "Series");
///
/// backend.remove(Path::new("/library/Series")).await;
/// assert!(backend.list_dir(Path::new("/library/Series")).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeSet<PathBuf>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path is relative or tries to traverse upwards. If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let set = files.into_iter().map(|path| Self::key(&path.into())).collect();
        Self { name: "mock".to_string(), files: RwLock::new(set) }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a file (and implicitly its parent directories).
    pub async fn insert(&self, path: impl Into<PathBuf>) {
        self.files.write().await.insert(Self::key(&path.into()));
    }

    /// Remove a file, or a directory and everything beneath it.
    pub async fn remove(&self, path: &Path) {
        let key = Self::key(path);
        self.files.write().await.retain(|file| !file.starts_with(&key));
    }

    fn key(path: &Path) -> PathBuf {
        let Ok(validated) = absolute(path).and_then(|p| validate_path(p)) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    fn lookup_key(path: &Path) -> Result<PathBuf> {
        absolute(path)?;
        // The filesystem root has no components left after validation.
        Ok(validate_path(path).unwrap_or_default())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(Vec::<PathBuf>::new())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_dir(&self, dir: &Path) -> Result<Vec<Entry>> {
        let key = Self::lookup_key(dir)?;
        let guard = self.files.read().await;
        if guard.contains(&key) {
            exn::bail!(ErrorKind::NotADirectory(dir.to_path_buf()));
        }
        let mut children = BTreeMap::new();
        for file in guard.iter() {
            let Ok(rest) = file.strip_prefix(&key) else { continue };
            let mut components = rest.components();
            let Some(first) = components.next() else { continue };
            let kind = match components.next() {
                Some(_) => EntryKind::Directory,
                None => EntryKind::File,
            };
            children.insert(first.as_os_str().to_os_string(), kind);
        }
        if children.is_empty() {
            exn::bail!(ErrorKind::NotFound(dir.to_path_buf()));
        }
        Ok(children
            .into_iter()
            .map(|(name, kind)| match kind {
                EntryKind::File => Entry::file(dir.join(name)),
                EntryKind::Directory => Entry::directory(dir.join(name)),
            })
            .collect())
    }

    fn walk_stream<'a>(&'a self, dir: &'a Path) -> PathStream<'a> {
        let key = match Self::lookup_key(dir) {
            Ok(key) => key,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let files: Vec<PathBuf> = {
                let guard = self.files.read().await;
                guard.iter().filter_map(|f| f.strip_prefix(&key).ok().map(Path::to_path_buf)).collect()
            };
            for file in files {
                if !file.as_os_str().is_empty() {
                    yield Ok(file);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_dir_infers_directories() {
        let backend = MockBackend::with_files([
            "/library/Series A/ch1.cbz",
            "/library/Series A/cover.jpg",
            "/library/Series B/v01.cbz",
            "/library/readme.txt",
        ]);
        let entries = backend.list_dir(Path::new("/library")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Series A", EntryKind::Directory),
                ("Series B", EntryKind::Directory),
                ("readme.txt", EntryKind::File),
            ]
        );
        assert_eq!(entries[0].path, PathBuf::from("/library/Series A"));
    }

    #[tokio::test]
    async fn test_list_dir_not_found() {
        let backend = MockBackend::with_files(["/library/Series/ch1.cbz"]);
        let err = backend.list_dir(Path::new("/elsewhere")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.list_dir(Path::new("/library/Series/ch1.cbz")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let backend = MockBackend::default();
        backend.insert("/library/Series/ch1.cbz").await;
        let entries = backend.list_dir(Path::new("/library/Series")).await.unwrap();
        assert_eq!(entries[0].name, "ch1.cbz");
        backend.remove(Path::new("/library/Series")).await;
        let err = backend.list_dir(Path::new("/library/Series")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_walk() {
        let backend = MockBackend::with_files(["/work/42/b/002.jpg", "/work/42/001.jpg", "/work/43/001.jpg"]);
        let files = backend.walk(Path::new("/work/42")).await.unwrap();
        assert_eq!(files, vec![PathBuf::from("001.jpg"), PathBuf::from("b/002.jpg")]);
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files(["relative/escape"]);
    }
}
