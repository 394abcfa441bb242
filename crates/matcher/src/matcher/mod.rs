//! The matcher protocol.
//!
//! A matcher recognizes one content family on disk. The scanner hands it
//! directory listings and it answers whether a directory is a collection,
//! which files are items, and how those should be identified and ordered.
//! Families form a closed set ([`MatcherFamily`]); a data source picks one
//! by its configured tag.

mod comic;

pub use self::comic::ComicMatcher;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{DiskCollection, DiskItem};
use crate::provider::ProviderHandle;
use async_trait::async_trait;
use folio_storage::Entry;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub type MatcherHandle = Arc<dyn Matcher + Send + Sync>;

/// A directory recognized as a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedCollection {
    pub content_uri: String,
    pub default_name: String,
    pub cover_path: Option<PathBuf>,
}

/// A file recognized as an item of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedItem {
    pub content_uri: String,
    pub default_name: String,
    pub path: PathBuf,
    pub cover_path: Option<PathBuf>,
}

#[async_trait]
pub trait Matcher: Send + Sync {
    fn family(&self) -> MatcherFamily;

    /// `None` unless `dir` holds at least one archive this family reads.
    fn check_is_collection(&self, dir: &Path, entries: &[Entry]) -> Option<MatchedCollection>;

    /// One entry per recognizable archive in the collection's directory.
    fn list_items(&self, collection: &DiskCollection, entries: &[Entry]) -> Vec<MatchedItem>;

    /// Refresh collection-level metadata. Must not touch `path` or
    /// `content_uri`.
    async fn update_collection(&self, collection: &mut DiskCollection) -> Result<()>;

    /// Refresh item-level fields such as the sort key. Must not touch `path`
    /// or `content_uri`.
    async fn update_items(&self, collection: &DiskCollection, items: &mut [DiskItem]) -> Result<()>;
}

/// Content families with a matcher implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherFamily {
    #[default]
    Comic,
}
impl MatcherFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherFamily::Comic => "comic",
        }
    }

    /// Build the matcher for this family. The provider, when given, is
    /// consulted by the collection update hook.
    pub fn matcher(self, provider: Option<ProviderHandle>) -> MatcherHandle {
        match self {
            MatcherFamily::Comic => Arc::new(ComicMatcher::new(provider)),
        }
    }
}
impl FromStr for MatcherFamily {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comic" | "comics" => Ok(MatcherFamily::Comic),
            _ => exn::bail!(ErrorKind::ParseError {
                field: "family",
                value: s.to_string(),
            }),
        }
    }
}
impl Display for MatcherFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse() {
        assert_eq!("Comics".parse::<MatcherFamily>().unwrap(), MatcherFamily::Comic);
        assert!("audiobook".parse::<MatcherFamily>().is_err());
        assert_eq!(MatcherFamily::Comic.matcher(None).family(), MatcherFamily::Comic);
    }
}
