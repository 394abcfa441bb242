//! Extracted-archive cache.
//!
//! Each disk item is unpacked into `<dir>/<item id>` the first time its pages
//! are requested and kept there for a sliding `ttl`. At most `max_entries`
//! items stay extracted; beyond that the oldest extraction is evicted.
//!
//! All bookkeeping lives behind one lock:
//! - `ready` holds finished listings with their expiry,
//! - `loading` holds the in-flight extraction per item, shared by every
//!   caller that asks while it runs (failures are handed to all of them and
//!   then forgotten),
//! - `removing` holds in-flight directory removals, which a new extraction of
//!   the same item waits for before touching the directory.

use crate::error::{Error, ErrorKind, Result};
use crate::locator::LocatorHandle;
use crate::pages::{PageSource, Pages, list_pages};
use async_trait::async_trait;
use exn::ResultExt;
use folio_archive::ExtractorHandle;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Parent of the per-item working directories.
    pub dir: PathBuf,
    pub ttl: Duration,
    pub max_entries: usize,
}
impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), ttl: DEFAULT_TTL, max_entries: DEFAULT_MAX_ENTRIES }
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    pub fn with_max_entries(self, max_entries: usize) -> Self {
        Self { max_entries: max_entries.max(1), ..self }
    }
}

type LoadOutcome = std::result::Result<Arc<Pages>, ErrorKind>;
type LoadFuture = Shared<BoxFuture<'static, LoadOutcome>>;
type RemovalFuture = Shared<BoxFuture<'static, ()>>;

struct Ready {
    pages: Arc<Pages>,
    expires_at: Instant,
    inserted: u64,
}

#[derive(Default)]
struct State {
    ready: HashMap<i64, Ready>,
    loading: HashMap<i64, LoadFuture>,
    removing: HashMap<i64, (u64, RemovalFuture)>,
    sequence: u64,
}
impl State {
    fn next(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

struct Inner {
    config: CacheConfig,
    extractor: ExtractorHandle,
    locator: LocatorHandle,
    state: Mutex<State>,
}

#[derive(Clone)]
pub struct ArchiveCache {
    inner: Arc<Inner>,
}
impl ArchiveCache {
    pub fn new(config: CacheConfig, extractor: ExtractorHandle, locator: LocatorHandle) -> Self {
        let inner = Inner { config, extractor, locator, state: Mutex::new(State::default()) };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock, but don't let a poisoned
        // lock take the whole cache down with it.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn working_dir(&self, item_id: i64) -> PathBuf {
        self.inner.config.dir.join(item_id.to_string())
    }

    /// Whether a finished, unexpired listing is held for `item_id`.
    pub fn is_cached(&self, item_id: i64) -> bool {
        self.state().ready.get(&item_id).is_some_and(|ready| ready.expires_at > Instant::now())
    }

    /// The page listing of a disk item, extracting its archive if needed.
    pub async fn get(&self, item_id: i64) -> Result<Arc<Pages>> {
        let load = {
            let mut state = self.state();
            let now = Instant::now();
            match state.ready.get_mut(&item_id) {
                Some(ready) if ready.expires_at > now => {
                    ready.expires_at = now + self.inner.config.ttl;
                    return Ok(Arc::clone(&ready.pages));
                },
                Some(_) => self.evict(&mut state, item_id),
                None => {},
            }
            match state.loading.get(&item_id) {
                Some(load) => load.clone(),
                None => self.start_load(&mut state, item_id),
            }
        };
        load.await.map_err(Error::from)
    }

    /// Run the extraction on its own task so that it completes, and cleans up
    /// after itself, even if every caller waiting on it goes away.
    fn start_load(&self, state: &mut State, item_id: i64) -> LoadFuture {
        let removal = state.removing.get(&item_id).map(|(_, removal)| removal.clone());
        let this = self.clone();
        let task = tokio::spawn(async move {
            match AssertUnwindSafe(this.load(item_id, removal)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => this.abandon(item_id).await,
            }
        });
        let this = self.clone();
        let load = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    this.state().loading.remove(&item_id);
                    Err(ErrorKind::Extraction(format!("extraction task failed: {err}")))
                },
            }
        }
        .boxed()
        .shared();
        state.loading.insert(item_id, load.clone());
        load
    }

    #[instrument(skip(self, removal))]
    async fn load(&self, item_id: i64, removal: Option<RemovalFuture>) -> LoadOutcome {
        if let Some(removal) = removal {
            tracing::debug!("Waiting for the previous working directory to be removed");
            removal.await;
        }
        let outcome = self.populate(item_id).await;
        let mut state = self.state();
        state.loading.remove(&item_id);
        match outcome {
            Ok(files) => {
                let pages = Arc::new(Pages { root: self.working_dir(item_id), files });
                let inserted = state.next();
                let expires_at = Instant::now() + self.inner.config.ttl;
                state.ready.insert(item_id, Ready { pages: Arc::clone(&pages), expires_at, inserted });
                self.enforce_capacity(&mut state);
                Ok(pages)
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Could not load pages");
                Err((*err).clone())
            },
        }
    }

    /// Clean up after a load that panicked part way through, so the next
    /// lookup starts from an empty directory.
    async fn abandon(&self, item_id: i64) -> LoadOutcome {
        let dir = self.working_dir(item_id);
        tracing::error!(item_id, "Extraction panicked");
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {},
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(err) => tracing::warn!(dir = %dir.display(), error = %err, "Could not remove failed extraction"),
        }
        self.state().loading.remove(&item_id);
        Err(ErrorKind::Extraction("extraction panicked".to_string()))
    }

    async fn populate(&self, item_id: i64) -> Result<Vec<String>> {
        let dir = self.working_dir(item_id);
        if has_entries(&dir).await {
            tracing::debug!(dir = %dir.display(), "Reusing existing working directory");
            return list_pages(&dir).await;
        }
        let archive = self
            .inner
            .locator
            .locate(item_id)
            .await?
            .ok_or_else(|| Error::from(ErrorKind::NotFound(format!("item {item_id}"))))?;
        if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
            exn::bail!(ErrorKind::NotFound(format!("archive {}", archive.display())));
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .or_raise(|| ErrorKind::Io(format!("could not create {}", dir.display())))?;
        tracing::info!(archive = %archive.display(), extractor = self.inner.extractor.name(), "Extracting archive");
        if let Err(err) = self.inner.extractor.extract(&archive, &dir).await {
            let message = (*err).to_string();
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %cleanup, "Could not remove failed extraction");
            }
            return Err(err.raise(ErrorKind::Extraction(message)));
        }
        let listed = list_pages(&dir).await;
        if listed.is_err() {
            _ = tokio::fs::remove_dir_all(&dir).await;
        }
        listed
    }

    /// Forget `item_id` and delete its working directory in the background.
    fn evict(&self, state: &mut State, item_id: i64) {
        if state.ready.remove(&item_id).is_none() {
            return;
        }
        let dir = self.working_dir(item_id);
        let generation = state.next();
        let removal = async move {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => tracing::debug!(dir = %dir.display(), "Removed working directory"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
                Err(err) => tracing::warn!(dir = %dir.display(), error = %err, "Could not remove working directory"),
            }
        }
        .boxed()
        .shared();
        state.removing.insert(item_id, (generation, removal.clone()));
        let this = self.clone();
        tokio::spawn(async move {
            removal.await;
            let mut state = this.state();
            if state.removing.get(&item_id).is_some_and(|(current, _)| *current == generation) {
                state.removing.remove(&item_id);
            }
        });
    }

    fn enforce_capacity(&self, state: &mut State) {
        while state.ready.len() > self.inner.config.max_entries {
            let Some(oldest) = state.ready.iter().min_by_key(|(_, ready)| ready.inserted).map(|(id, _)| *id) else {
                break;
            };
            tracing::debug!(item_id = oldest, "Evicting oldest extraction");
            self.evict(state, oldest);
        }
    }

    /// Evict every expired entry and wait until all pending directory
    /// removals have finished. Returns how many entries were evicted.
    pub async fn purge(&self) -> usize {
        let (evicted, removals) = {
            let mut state = self.state();
            let now = Instant::now();
            let expired: Vec<i64> =
                state.ready.iter().filter(|(_, ready)| ready.expires_at <= now).map(|(id, _)| *id).collect();
            for item_id in &expired {
                self.evict(&mut state, *item_id);
            }
            let removals: Vec<RemovalFuture> = state.removing.values().map(|(_, removal)| removal.clone()).collect();
            (expired.len(), removals)
        };
        join_all(removals).await;
        if evicted > 0 {
            tracing::info!(evicted, "Purged expired extractions");
        }
        evicted
    }

    /// Purge on a fixed interval until the task is dropped.
    pub async fn run_purger(self, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.purge().await;
        }
    }
}

#[async_trait]
impl PageSource for ArchiveCache {
    async fn pages(&self, item_id: i64) -> Result<Arc<Pages>> {
        self.get(item_id).await
    }
}

async fn has_entries(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}
