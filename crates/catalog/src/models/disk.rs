use super::{from_json, optional_path_to_text, path_to_text, text_to_path, to_json};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use folio_matcher::MatcherFamily;
use folio_matcher::models::{DiskCollection, DiskItem, SortKey};
use std::path::PathBuf;

#[derive(sqlx::FromRow)]
pub(crate) struct DiskCollectionRow {
    pub id: i64,
    pub data_source_id: i64,
    pub content_uri: String,
    pub content_uri_override: Option<String>,
    pub name: String,
    pub path: String,
    pub cover_path: Option<String>,
    pub missing: bool,
    pub kind: String,
    pub sources: String,
}
impl TryFrom<&DiskCollection> for DiskCollectionRow {
    type Error = Error;
    fn try_from(collection: &DiskCollection) -> Result<Self> {
        Ok(Self {
            id: collection.id,
            data_source_id: collection.data_source_id,
            content_uri: collection.content_uri.clone(),
            content_uri_override: collection.content_uri_override.clone(),
            name: collection.name.clone(),
            path: path_to_text(&collection.path, "collection path")?,
            cover_path: optional_path_to_text(collection.cover_path.as_deref(), "cover path")?,
            missing: collection.missing,
            kind: collection.kind.to_string(),
            sources: to_json(&collection.sources, "metadata sources")?,
        })
    }
}
impl TryFrom<DiskCollectionRow> for DiskCollection {
    type Error = Error;
    fn try_from(row: DiskCollectionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            data_source_id: row.data_source_id,
            content_uri: row.content_uri,
            content_uri_override: row.content_uri_override,
            name: row.name,
            path: PathBuf::from(row.path),
            cover_path: text_to_path(row.cover_path),
            missing: row.missing,
            kind: row.kind.parse::<MatcherFamily>().or_raise(|| ErrorKind::InvalidData("matcher family"))?,
            sources: from_json(&row.sources, "metadata sources")?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct DiskItemRow {
    pub id: i64,
    pub disk_collection_id: i64,
    pub content_uri: String,
    pub name: String,
    pub path: String,
    pub cover_path: Option<String>,
    pub sort_volume: f64,
    pub sort_chapter: f64,
    pub sources: String,
}
impl TryFrom<&DiskItem> for DiskItemRow {
    type Error = Error;
    fn try_from(item: &DiskItem) -> Result<Self> {
        Ok(Self {
            id: item.id,
            disk_collection_id: item.disk_collection_id,
            content_uri: item.content_uri.clone(),
            name: item.name.clone(),
            path: path_to_text(&item.path, "item path")?,
            cover_path: optional_path_to_text(item.cover_path.as_deref(), "cover path")?,
            sort_volume: item.sort_key.volume,
            sort_chapter: item.sort_key.chapter,
            sources: to_json(&item.sources, "metadata sources")?,
        })
    }
}
impl TryFrom<DiskItemRow> for DiskItem {
    type Error = Error;
    fn try_from(row: DiskItemRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            disk_collection_id: row.disk_collection_id,
            content_uri: row.content_uri,
            name: row.name,
            path: PathBuf::from(row.path),
            cover_path: text_to_path(row.cover_path),
            sort_key: SortKey { volume: row.sort_volume, chapter: row.sort_chapter },
            sources: from_json(&row.sources, "metadata sources")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_column_is_json() {
        let row = DiskItemRow {
            id: 7,
            disk_collection_id: 2,
            content_uri: "example:c1".to_string(),
            name: "Chapter 1".to_string(),
            path: "/srv/comics/Example/ch1.cbz".to_string(),
            cover_path: None,
            sort_volume: 1_000_000.0,
            sort_chapter: 1.0,
            sources: r#"[{"name":"file","data":{"pages":[{"name":"01.png","width":800,"height":1200}]}}]"#.to_string(),
        };
        let item = DiskItem::try_from(row).unwrap();
        assert_eq!(item.sort_key, SortKey::new(None, Some(1.0)));
        let pages = item.sources[0].data.pages.as_ref().unwrap();
        assert_eq!(pages[0].width, 800);
    }

    #[test]
    fn test_corrupt_sources_are_invalid() {
        let row = DiskCollectionRow {
            id: 1,
            data_source_id: 1,
            content_uri: "example".to_string(),
            content_uri_override: None,
            name: "Example".to_string(),
            path: "/srv/comics/Example".to_string(),
            cover_path: None,
            missing: false,
            kind: "comic".to_string(),
            sources: "{not json".to_string(),
        };
        let err = DiskCollection::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("metadata sources")));
    }
}
