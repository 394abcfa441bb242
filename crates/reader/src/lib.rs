//! Serving pages out of comic archives.
//!
//! Archives are unpacked lazily, one working directory per disk item, by the
//! [`ArchiveCache`]. Only one process may own the cache; everything else asks
//! it for listings through [`RemotePages`]. Callers that only need to read
//! pages depend on the [`PageSource`] trait and don't care which one they got.

mod cache;
pub mod error;
mod geometry;
mod locator;
mod pages;
mod remote;

pub use crate::cache::{ArchiveCache, CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use crate::geometry::page_metadata;
pub use crate::locator::{ArchiveLocator, LocatorHandle};
pub use crate::pages::{PageSource, PageSourceHandle, Pages, open_page};
pub use crate::remote::{PAGES_FUNCTION, PAGES_TIMEOUT, RemotePages, register_pages};
