//! Catalog repository.
//!
//! One repository covers every table: the scanner and the merger walk the
//! whole hierarchy (data source, disk collection, disk item, canonical
//! collection, canonical item) and splitting it per table would only move the
//! pool around.

use crate::Database;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{CollectionRow, DataSourceRow, DiskCollectionRow, DiskItemRow, ItemRow};
use exn::{OptionExt, ResultExt};
use folio_matcher::models::{Collection, DataSource, DiskCollection, DiskItem, Item};
use sqlx::SqlitePool;

/// Unique violations become [`ErrorKind::Conflict`], everything else is a
/// plain database error.
fn write_error(err: sqlx::Error, entity: &'static str) -> Error {
    let conflict = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    let kind = if conflict { ErrorKind::Conflict(entity) } else { ErrorKind::Database };
    exn::Exn::from(err).raise(kind)
}

fn convert_all<R, M>(rows: Vec<R>) -> Result<Vec<M>>
where
    M: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(M::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    /// Persist a new data source, returning it with its assigned id.
    ///
    /// Names are unique; a duplicate is an [`ErrorKind::Conflict`].
    pub async fn create_data_source(&self, source: &DataSource) -> Result<DataSource> {
        let row = DataSourceRow::try_from(source)?;
        let id: i64 = sqlx::query_scalar(include_str!("../queries/insert_data_source.sql"))
            .bind(&row.name)
            .bind(&row.family)
            .bind(&row.paths)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "data source"))?;
        tracing::info!(id, name = %source.name, "Created data source");
        Ok(DataSource { id, ..source.clone() })
    }

    pub async fn update_data_source(&self, source: &DataSource) -> Result<()> {
        let row = DataSourceRow::try_from(source)?;
        let result = sqlx::query(include_str!("../queries/update_data_source.sql"))
            .bind(row.name)
            .bind(row.family)
            .bind(row.paths)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "data source"))?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("data source", source.id));
        }
        Ok(())
    }

    /// Delete a data source along with every disk collection and disk item
    /// scanned from it. Canonical entities are left alone.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete_data_source(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_data_source.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        let rows: Vec<DataSourceRow> = sqlx::query_as(include_str!("../queries/list_data_sources.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn get_data_source(&self, id: i64) -> Result<Option<DataSource>> {
        let row: Option<DataSourceRow> = sqlx::query_as(include_str!("../queries/get_data_source.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DataSource::try_from).transpose()
    }

    pub async fn get_data_source_by_name(&self, name: impl AsRef<str>) -> Result<Option<DataSource>> {
        let row: Option<DataSourceRow> = sqlx::query_as(include_str!("../queries/get_data_source_by_name.sql"))
            .bind(name.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DataSource::try_from).transpose()
    }

    // =========================================================================
    // Disk Collections
    // =========================================================================

    /// Disk collections of one data source, missing ones included.
    pub async fn list_disk_collections(&self, data_source_id: i64) -> Result<Vec<DiskCollection>> {
        let rows: Vec<DiskCollectionRow> = sqlx::query_as(include_str!("../queries/list_disk_collections.sql"))
            .bind(data_source_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn list_all_disk_collections(&self) -> Result<Vec<DiskCollection>> {
        let rows: Vec<DiskCollectionRow> = sqlx::query_as(include_str!("../queries/list_all_disk_collections.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn get_disk_collection(&self, id: i64) -> Result<Option<DiskCollection>> {
        let row: Option<DiskCollectionRow> = sqlx::query_as(include_str!("../queries/get_disk_collection.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DiskCollection::try_from).transpose()
    }

    /// Returns the new row id. The content URI must be unique within the data
    /// source.
    pub async fn insert_disk_collection(&self, collection: &DiskCollection) -> Result<i64> {
        let row = DiskCollectionRow::try_from(collection)?;
        sqlx::query_scalar(include_str!("../queries/insert_disk_collection.sql"))
            .bind(row.data_source_id)
            .bind(row.content_uri)
            .bind(row.content_uri_override)
            .bind(row.name)
            .bind(row.path)
            .bind(row.cover_path)
            .bind(row.missing)
            .bind(row.kind)
            .bind(row.sources)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "disk collection"))
    }

    /// Writes everything a scan may change. The content URI and its override
    /// are not touched.
    pub async fn update_disk_collection(&self, collection: &DiskCollection) -> Result<()> {
        let row = DiskCollectionRow::try_from(collection)?;
        let result = sqlx::query(include_str!("../queries/update_disk_collection.sql"))
            .bind(row.name)
            .bind(row.path)
            .bind(row.cover_path)
            .bind(row.missing)
            .bind(row.kind)
            .bind(row.sources)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("disk collection", collection.id));
        }
        Ok(())
    }

    /// Point a disk collection at a different canonical collection. `None`
    /// restores the discovered URI.
    pub async fn set_content_uri_override(&self, id: i64, content_uri: Option<&str>) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/set_content_uri_override.sql"))
            .bind(content_uri)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("disk collection", id));
        }
        Ok(())
    }

    // =========================================================================
    // Disk Items
    // =========================================================================

    pub async fn list_disk_items(&self, disk_collection_id: i64) -> Result<Vec<DiskItem>> {
        let rows: Vec<DiskItemRow> = sqlx::query_as(include_str!("../queries/list_disk_items.sql"))
            .bind(disk_collection_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn list_all_disk_items(&self) -> Result<Vec<DiskItem>> {
        let rows: Vec<DiskItemRow> = sqlx::query_as(include_str!("../queries/list_all_disk_items.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn get_disk_item(&self, id: i64) -> Result<Option<DiskItem>> {
        let row: Option<DiskItemRow> = sqlx::query_as(include_str!("../queries/get_disk_item.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DiskItem::try_from).transpose()
    }

    pub async fn insert_disk_item(&self, item: &DiskItem) -> Result<i64> {
        let row = DiskItemRow::try_from(item)?;
        sqlx::query_scalar(include_str!("../queries/insert_disk_item.sql"))
            .bind(row.disk_collection_id)
            .bind(row.content_uri)
            .bind(row.name)
            .bind(row.path)
            .bind(row.cover_path)
            .bind(row.sort_volume)
            .bind(row.sort_chapter)
            .bind(row.sources)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "disk item"))
    }

    pub async fn update_disk_item(&self, item: &DiskItem) -> Result<()> {
        let row = DiskItemRow::try_from(item)?;
        let result = sqlx::query(include_str!("../queries/update_disk_item.sql"))
            .bind(row.name)
            .bind(row.path)
            .bind(row.cover_path)
            .bind(row.sort_volume)
            .bind(row.sort_chapter)
            .bind(row.sources)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("disk item", item.id));
        }
        Ok(())
    }

    pub async fn delete_disk_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_disk_item.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Every canonical collection, ordered by display name.
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let rows: Vec<CollectionRow> = sqlx::query_as(include_str!("../queries/list_collections.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let row: Option<CollectionRow> = sqlx::query_as(include_str!("../queries/get_collection.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Collection::try_from).transpose()
    }

    pub async fn get_collection_by_uri(&self, content_uri: impl AsRef<str>) -> Result<Option<Collection>> {
        let row: Option<CollectionRow> = sqlx::query_as(include_str!("../queries/get_collection_by_uri.sql"))
            .bind(content_uri.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Collection::try_from).transpose()
    }

    /// Insert unless a collection with the same content URI already exists.
    /// Either way, returns the id of the collection holding that URI.
    pub async fn insert_collection(&self, collection: &Collection) -> Result<i64> {
        let row = CollectionRow::try_from(collection)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/insert_collection.sql"))
            .bind(&row.content_uri)
            .bind(row.name)
            .bind(row.name_override)
            .bind(row.cover_path)
            .bind(row.kind)
            .bind(row.sources)
            .bind(row.merged)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM collections WHERE content_uri = ?")
            .bind(&row.content_uri)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        id.ok_or_raise(|| ErrorKind::Database)
    }

    /// Writes name, cover, kind, sources and merged metadata. The name
    /// override is only changed through
    /// [`set_collection_name_override`](Self::set_collection_name_override).
    pub async fn update_collection(&self, collection: &Collection) -> Result<()> {
        let row = CollectionRow::try_from(collection)?;
        let result = sqlx::query(include_str!("../queries/update_collection.sql"))
            .bind(row.name)
            .bind(row.cover_path)
            .bind(row.kind)
            .bind(row.sources)
            .bind(row.merged)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("collection", collection.id));
        }
        Ok(())
    }

    pub async fn set_collection_name_override(&self, id: i64, name: Option<&str>) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/set_collection_name_override.sql"))
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("collection", id));
        }
        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Items of one collection, most recent (highest sort key) first.
    pub async fn list_items(&self, collection_id: i64) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/list_items.sql"))
            .bind(collection_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        convert_all(rows)
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(include_str!("../queries/get_item.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Item::try_from).transpose()
    }

    pub async fn get_item_by_uri(&self, content_uri: impl AsRef<str>) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(include_str!("../queries/get_item_by_uri.sql"))
            .bind(content_uri.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Item::try_from).transpose()
    }

    /// Same contract as [`insert_collection`](Self::insert_collection).
    pub async fn insert_item(&self, item: &Item) -> Result<i64> {
        let row = ItemRow::try_from(item)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/insert_item.sql"))
            .bind(row.collection_id)
            .bind(&row.content_uri)
            .bind(row.name)
            .bind(row.cover_path)
            .bind(row.kind)
            .bind(row.sort_volume)
            .bind(row.sort_chapter)
            .bind(row.sources)
            .bind(row.merged)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, "item"))?;
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM items WHERE content_uri = ?")
            .bind(&row.content_uri)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        id.ok_or_raise(|| ErrorKind::Database)
    }

    pub async fn update_item(&self, item: &Item) -> Result<()> {
        let row = ItemRow::try_from(item)?;
        let result = sqlx::query(include_str!("../queries/update_item.sql"))
            .bind(row.name)
            .bind(row.cover_path)
            .bind(row.kind)
            .bind(row.sort_volume)
            .bind(row.sort_chapter)
            .bind(row.sources)
            .bind(row.merged)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound("item", item.id));
        }
        Ok(())
    }
}
