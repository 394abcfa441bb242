use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use folio_archive::is_image;
use folio_storage::backend::{LocalBackend, StorageBackend};
use folio_storage::join_within;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;

pub type PageSourceHandle = Arc<dyn PageSource + Send + Sync>;

/// The unpacked pages of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pages {
    /// Working directory the archive was extracted into.
    pub root: PathBuf,
    /// Page images relative to `root`, `/`-separated, sorted.
    pub files: Vec<String>,
}
impl Pages {
    pub fn contains(&self, name: &str) -> bool {
        self.files.binary_search_by(|f| f.as_str().cmp(name)).is_ok()
    }
}

/// Anything that can produce the page listing of a disk item: the cache
/// itself in the coordinator, or a connection to it elsewhere.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn pages(&self, item_id: i64) -> Result<Arc<Pages>>;
}

/// Every image file beneath `root`, as sorted `/`-separated relative paths.
pub(crate) async fn list_pages(root: &Path) -> Result<Vec<String>> {
    let files = LocalBackend::default()
        .walk(root)
        .await
        .or_raise(|| ErrorKind::Io(format!("could not list {}", root.display())))?;
    let mut pages: Vec<String> = files
        .iter()
        .filter(|path| is_image(path))
        .map(|path| path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/"))
        .collect();
    // Path ordering compares by component; page order is plain string order.
    pages.sort();
    Ok(pages)
}

/// Open one page of an item for streaming.
///
/// The name must be one the listing contains; anything else (including names
/// that would resolve outside the working directory) is `NotFound`.
pub async fn open_page(source: &dyn PageSource, item_id: i64, name: &str) -> Result<(File, u64)> {
    let pages = source.pages(item_id).await?;
    if !pages.contains(name) {
        exn::bail!(ErrorKind::NotFound(format!("page '{name}' of item {item_id}")));
    }
    let path = join_within(&pages.root, name).or_raise(|| ErrorKind::NotFound(format!("page '{name}'")))?;
    let file = File::open(&path).await.or_raise(|| ErrorKind::NotFound(format!("page '{name}'")))?;
    let len = file.metadata().await.or_raise(|| ErrorKind::Io(format!("could not stat {}", path.display())))?.len();
    Ok((file, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    struct Fixed(Arc<Pages>);

    #[async_trait]
    impl PageSource for Fixed {
        async fn pages(&self, _item_id: i64) -> Result<Arc<Pages>> {
            Ok(Arc::clone(&self.0))
        }
    }

    async fn fixture() -> (tempfile::TempDir, Fixed) {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("ch1")).await.unwrap();
        tokio::fs::write(dir.path().join("ch1/002.png"), b"two").await.unwrap();
        tokio::fs::write(dir.path().join("001.jpg"), b"one!").await.unwrap();
        tokio::fs::write(dir.path().join("ComicInfo.xml"), b"<xml/>").await.unwrap();
        let files = list_pages(dir.path()).await.unwrap();
        let pages = Pages { root: dir.path().to_path_buf(), files };
        (dir, Fixed(Arc::new(pages)))
    }

    #[tokio::test]
    async fn test_list_pages_filters_and_sorts() {
        let (_dir, source) = fixture().await;
        assert_eq!(source.0.files, vec!["001.jpg", "ch1/002.png"]);
    }

    #[tokio::test]
    async fn test_open_listed_page() {
        let (_dir, source) = fixture().await;
        let (mut file, len) = open_page(&source, 1, "ch1/002.png").await.unwrap();
        assert_eq!(len, 3);
        let mut contents = String::new();
        file.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "two");
    }

    #[tokio::test]
    async fn test_unlisted_pages_are_not_found() {
        let (_dir, source) = fixture().await;
        for name in ["ComicInfo.xml", "../secret.png", "003.png"] {
            let err = open_page(&source, 1, name).await.unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)), "{name}");
        }
    }
}
