//! Recognizing collections and items on disk.
//!
//! This crate holds the catalog's domain [`models`], the [`Matcher`]
//! protocol with its per-family implementations, the name heuristics those
//! implementations share, and the [`MetadataProvider`](provider::MetadataProvider)
//! seam for remote metadata.

mod consts;
pub mod error;
mod matcher;
pub mod models;
mod name;
pub mod provider;

pub use crate::matcher::{
    ComicMatcher, MatchedCollection, MatchedItem, Matcher, MatcherFamily, MatcherHandle,
};
pub use crate::name::{NameData, URI_SEPARATOR, clean_name, collection_uri, item_uri, parent_uri, slug};
