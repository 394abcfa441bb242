//! Storage backend trait and implementations.
//!
//! The scanner only ever needs two things from a library root: the immediate
//! children of a directory, and every file beneath an extracted archive's
//! working directory. Both are covered by [`StorageBackend`].

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::Entry;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) type PathStream<'a> = Pin<Box<dyn Stream<Item = Result<PathBuf>> + Send + 'a>>;

/// Unified interface for reading library roots.
///
/// # Path Handling
/// Paths handed to a backend are absolute. Library roots come from
/// configuration and are used verbatim; relative paths are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use folio_storage::{backend::StorageBackend, error::Result};
///
/// async fn count_archives(backend: &dyn StorageBackend) -> Result<usize> {
///     let entries = backend.list_dir(Path::new("/library/comics/Series")).await?;
///     Ok(entries.iter().filter(|e| e.is_file() && e.name.ends_with(".cbz")).count())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend (used for logging only).
    fn name(&self) -> &str;

    /// List the immediate children of `dir`, sorted by name.
    ///
    /// Entries that are neither files nor directories (broken symlinks,
    /// sockets) are silently dropped.
    async fn list_dir(&self, dir: &Path) -> Result<Vec<Entry>>;

    /// Stream every file beneath `dir`, recursively, as paths relative to
    /// `dir`. Order is unspecified.
    fn walk_stream<'a>(&'a self, dir: &'a Path) -> PathStream<'a>;

    /// Collect [`walk_stream()`](Self::walk_stream) and sort the result.
    async fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self.walk_stream(dir).try_collect().await?;
        files.sort();
        Ok(files)
    }
}
