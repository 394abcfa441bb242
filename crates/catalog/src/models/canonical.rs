use super::{from_json, optional_path_to_text, text_to_path, to_json};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use folio_matcher::MatcherFamily;
use folio_matcher::models::{Collection, Item, SortKey};

#[derive(sqlx::FromRow)]
pub(crate) struct CollectionRow {
    pub id: i64,
    pub content_uri: String,
    pub name: String,
    pub name_override: Option<String>,
    pub cover_path: Option<String>,
    pub kind: String,
    pub sources: String,
    pub merged: String,
}
impl TryFrom<&Collection> for CollectionRow {
    type Error = Error;
    fn try_from(collection: &Collection) -> Result<Self> {
        Ok(Self {
            id: collection.id,
            content_uri: collection.content_uri.clone(),
            name: collection.name.clone(),
            name_override: collection.name_override.clone(),
            cover_path: optional_path_to_text(collection.cover_path.as_deref(), "cover path")?,
            kind: collection.kind.to_string(),
            sources: to_json(&collection.sources, "metadata sources")?,
            merged: to_json(&collection.merged, "merged metadata")?,
        })
    }
}
impl TryFrom<CollectionRow> for Collection {
    type Error = Error;
    fn try_from(row: CollectionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            content_uri: row.content_uri,
            name: row.name,
            name_override: row.name_override,
            cover_path: text_to_path(row.cover_path),
            kind: row.kind.parse::<MatcherFamily>().or_raise(|| ErrorKind::InvalidData("matcher family"))?,
            sources: from_json(&row.sources, "metadata sources")?,
            merged: from_json(&row.merged, "merged metadata")?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub id: i64,
    pub collection_id: i64,
    pub content_uri: String,
    pub name: String,
    pub cover_path: Option<String>,
    pub kind: String,
    pub sort_volume: f64,
    pub sort_chapter: f64,
    pub sources: String,
    pub merged: String,
}
impl TryFrom<&Item> for ItemRow {
    type Error = Error;
    fn try_from(item: &Item) -> Result<Self> {
        Ok(Self {
            id: item.id,
            collection_id: item.collection_id,
            content_uri: item.content_uri.clone(),
            name: item.name.clone(),
            cover_path: optional_path_to_text(item.cover_path.as_deref(), "cover path")?,
            kind: item.kind.to_string(),
            sort_volume: item.sort_key.volume,
            sort_chapter: item.sort_key.chapter,
            sources: to_json(&item.sources, "metadata sources")?,
            merged: to_json(&item.merged, "merged metadata")?,
        })
    }
}
impl TryFrom<ItemRow> for Item {
    type Error = Error;
    fn try_from(row: ItemRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            collection_id: row.collection_id,
            content_uri: row.content_uri,
            name: row.name,
            cover_path: text_to_path(row.cover_path),
            kind: row.kind.parse::<MatcherFamily>().or_raise(|| ErrorKind::InvalidData("matcher family"))?,
            sort_key: SortKey { volume: row.sort_volume, chapter: row.sort_chapter },
            sources: from_json(&row.sources, "metadata sources")?,
            merged: from_json(&row.merged, "merged metadata")?,
        })
    }
}
