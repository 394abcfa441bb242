//! Row types and their conversions to and from `folio_matcher` models.
//!
//! Paths are stored as UTF-8 text; metadata sources, merged metadata and
//! data source roots are stored as JSON text.

mod canonical;
mod disk;
mod source;

pub(crate) use self::canonical::{CollectionRow, ItemRow};
pub(crate) use self::disk::{DiskCollectionRow, DiskItemRow};
pub(crate) use self::source::DataSourceRow;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub(crate) fn path_to_text(path: &Path, field: &'static str) -> Result<String> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData(field))?.to_string())
}

pub(crate) fn optional_path_to_text(path: Option<&Path>, field: &'static str) -> Result<Option<String>> {
    path.map(|p| path_to_text(p, field)).transpose()
}

pub(crate) fn text_to_path(text: Option<String>) -> Option<PathBuf> {
    text.map(PathBuf::from)
}

pub(crate) fn to_json<T: Serialize>(value: &T, field: &'static str) -> Result<String> {
    serde_json::to_string(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn from_json<T: DeserializeOwned>(text: &str, field: &'static str) -> Result<T> {
    serde_json::from_str(text).or_raise(|| ErrorKind::InvalidData(field))
}
