//! Remote metadata lookups.
//!
//! Providers are external collaborators: they answer on a best-effort basis
//! and their failures end up in the [`MetadataSource`](crate::models::MetadataSource)
//! `error` field instead of interrupting a scan.

use crate::error::Result;
use crate::models::MetadataData;
use async_trait::async_trait;
use std::sync::Arc;

pub type ProviderHandle = Arc<dyn MetadataProvider + Send + Sync>;

/// What a provider found for one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderMatch {
    /// The provider's own identifier for the match, remembered so the next
    /// refresh can look it up directly instead of searching by title again.
    pub remote_id: Option<String>,
    pub data: MetadataData,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Also used as the name of the metadata source the results are stored in.
    fn name(&self) -> &str;

    /// Look up by `remote_id` when one is known, by `title` otherwise.
    /// `Ok(None)` means the provider has nothing for this collection.
    async fn fetch(&self, title: &str, remote_id: Option<&str>) -> Result<Option<ProviderMatch>>;
}
