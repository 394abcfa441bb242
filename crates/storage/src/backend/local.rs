//! Local filesystem storage backend.
//!
//! Directory listing and recursive walks using `tokio::fs` for async I/O.

use crate::backend::PathStream;
use crate::error::{ErrorKind, Result};
use crate::path::absolute;
use crate::{Entry, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use folio_storage::backend::{LocalBackend, StorageBackend};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local");
/// let entries = backend.list_dir(Path::new("/library/comics")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
}
impl LocalBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    async fn process_entry(&self, entry: DirEntry, root: &Path) -> Result<WalkEntry> {
        let path = entry.path();
        // Follows symlinks; a broken link errors and gets skipped below.
        let Ok(metadata) = fs::metadata(&path).await else {
            return Ok(WalkEntry::Skip);
        };
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            let relative = path.strip_prefix(root).map_err(|_| ErrorKind::InvalidPath(path.clone()))?;
            return Ok(WalkEntry::File(relative.to_path_buf()));
        }
        Ok(WalkEntry::Skip)
    }
}
impl Default for LocalBackend {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_dir(&self, dir: &Path) -> Result<Vec<Entry>> {
        let dir = absolute(dir)?;
        let mut entries = fs::read_dir(dir).await.map_err(|e| ErrorKind::from_io(e, dir))?;
        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, dir))? {
            let path = entry.path();
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => listing.push(Entry::directory(path)),
                Ok(meta) if meta.is_file() => listing.push(Entry::file(path)),
                Ok(_) => {},
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "Skipping unreadable directory entry");
                },
            }
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn walk_stream<'a>(&'a self, dir: &'a Path) -> PathStream<'a> {
        let root = match absolute(dir) {
            Ok(root) => root,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let mut stack = vec![root.to_path_buf()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(ErrorKind::from_io(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, root).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryKind;

    #[tokio::test]
    async fn test_list_dir_sorted_with_kinds() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("Series B")).unwrap();
        std::fs::create_dir(temp_dir.path().join("Series A")).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();
        let backend = LocalBackend::default();
        let entries = backend.list_dir(temp_dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Series A", EntryKind::Directory),
                ("Series B", EntryKind::Directory),
                ("notes.txt", EntryKind::File),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_dir_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::default();
        let err = backend.list_dir(&temp_dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_relative_paths_rejected() {
        let backend = LocalBackend::default();
        let err = backend.list_dir(Path::new("relative/path")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
        assert!(backend.walk(Path::new("./relative")).await.is_err());
    }

    #[tokio::test]
    async fn test_walk_is_recursive_and_relative() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("b/nested")).unwrap();
        std::fs::write(temp_dir.path().join("b/nested/003.jpg"), b"3").unwrap();
        std::fs::write(temp_dir.path().join("002.jpg"), b"2").unwrap();
        std::fs::write(temp_dir.path().join("001.jpg"), b"1").unwrap();
        let backend = LocalBackend::default();
        let files = backend.walk(temp_dir.path()).await.unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("001.jpg"), PathBuf::from("002.jpg"), PathBuf::from("b/nested/003.jpg")]
        );
    }
}
