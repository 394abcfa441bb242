//! Page listings through the coordinator.
//!
//! The coordinator owns the one [`ArchiveCache`] and registers it with
//! [`register_pages`]; other processes call it through [`RemotePages`].

use crate::cache::ArchiveCache;
use crate::error::{Error, ErrorKind, Result};
use crate::pages::{PageSource, Pages};
use async_trait::async_trait;
use folio_rpc::error::ErrorKind as RpcErrorKind;
use folio_rpc::{Client, Coordinator, RemoteError, RemoteFn};
use std::sync::Arc;
use std::time::Duration;

pub const PAGES_FUNCTION: &str = "pages";
/// Extraction of a large archive can take a while.
pub const PAGES_TIMEOUT: Duration = Duration::from_secs(60);

fn to_remote(err: Error) -> RemoteError {
    RemoteError::new(err.code(), err.message())
}

fn from_rpc(err: folio_rpc::error::Error) -> Error {
    let kind = match &*err {
        RpcErrorKind::Timeout(_) => ErrorKind::Timeout,
        RpcErrorKind::Remote { code, message } => ErrorKind::from_code(code, message.clone()),
        other => ErrorKind::Coordinator(other.to_string()),
    };
    err.raise(kind)
}

/// Serve the cache's page listings under [`PAGES_FUNCTION`].
pub fn register_pages(coordinator: &mut Coordinator, cache: ArchiveCache) {
    coordinator.register(PAGES_FUNCTION, move |(item_id,): (i64,)| {
        let cache = cache.clone();
        async move { cache.get(item_id).await.map(|pages| Pages::clone(&pages)).map_err(to_remote) }
    });
}

/// [`PageSource`] backed by a [`RemoteFn`]: in-process when built with
/// [`local`](Self::local), over the coordinator connection otherwise.
#[derive(Clone)]
pub struct RemotePages {
    function: RemoteFn<(i64,), Pages>,
}
impl RemotePages {
    pub fn local(cache: ArchiveCache) -> Self {
        let function = RemoteFn::local(PAGES_FUNCTION, move |(item_id,): (i64,)| {
            let cache = cache.clone();
            async move { cache.get(item_id).await.map(|pages| Pages::clone(&pages)).map_err(to_remote) }
        });
        Self { function }
    }

    pub fn remote(client: Client, timeout: Duration) -> Self {
        Self { function: RemoteFn::remote(PAGES_FUNCTION, client, timeout) }
    }
}

#[async_trait]
impl PageSource for RemotePages {
    async fn pages(&self, item_id: i64) -> Result<Arc<Pages>> {
        self.function.call((item_id,)).await.map(Arc::new).map_err(from_rpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::locator::ArchiveLocator;
    use folio_archive::AutoExtractor;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    struct Single(PathBuf);

    #[async_trait]
    impl ArchiveLocator for Single {
        async fn locate(&self, item_id: i64) -> Result<Option<PathBuf>> {
            Ok((item_id == 1).then(|| self.0.clone()))
        }
    }

    fn write_cbz(path: &Path) {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for name in ["02.png", "01.png", "notes.txt"] {
            zip.start_file(name, options).unwrap();
            zip.write_all(name.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn cache(tmp: &Path) -> ArchiveCache {
        let archive = tmp.join("ch1.cbz");
        write_cbz(&archive);
        let config = CacheConfig::new(tmp.join("cache"));
        ArchiveCache::new(config, Arc::new(AutoExtractor::builtin_only()), Arc::new(Single(archive)))
    }

    #[tokio::test]
    async fn test_pages_through_coordinator() {
        let tmp = tempfile::tempdir().unwrap();
        let mut coordinator = Coordinator::new();
        register_pages(&mut coordinator, cache(tmp.path()));
        let (server, client) = tokio::io::duplex(4096);
        tokio::spawn(async move { coordinator.serve(server).await });

        let source = RemotePages::remote(Client::new(client), PAGES_TIMEOUT);
        let pages = source.pages(1).await.unwrap();
        assert_eq!(pages.files, vec!["01.png", "02.png"]);
        assert_eq!(pages.root, tmp.path().join("cache/1"));

        let err = source.pages(2).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let source = RemotePages::local(cache(tmp.path()));
        assert_eq!(source.pages(1).await.unwrap().files.len(), 2);
        assert!(matches!(&*source.pages(5).await.unwrap_err(), ErrorKind::NotFound(_)));
    }
}
