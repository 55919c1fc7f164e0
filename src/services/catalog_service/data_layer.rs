use axum::async_trait;
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::{data_layer_error::Result, models::catalog_models::{ItemModel, NewItemModel, StoreEntity}};

#[async_trait]
pub trait CatalogDataLayer : Send + Sync {
    async fn get_store_by_name<'a>(&self, name: &'a str) -> Result<Option<StoreEntity>>;
    async fn get_store_by_id(&self, id: i64) -> Result<Option<StoreEntity>>;
    async fn get_all_stores(&self) -> Result<Vec<StoreEntity>>;
    ///
    /// Returns `None` if a store with the same name already exists
    ///
    async fn create_store<'a>(&self, name: &'a str) -> Result<Option<StoreEntity>>;
    async fn delete_store<'a>(&self, name: &'a str) -> Result<()>;

    async fn get_item_by_name<'a>(&self, name: &'a str) -> Result<Option<ItemModel>>;
    async fn get_items_by_store(&self, store_id: i64) -> Result<Vec<ItemModel>>;
    async fn get_all_items(&self) -> Result<Vec<ItemModel>>;
    ///
    /// Returns `None` if an item with the same name already exists
    ///
    async fn create_item<'a>(&self, item: &'a NewItemModel) -> Result<Option<ItemModel>>;
    ///
    /// Inserts the item, or overwrites price and store of the item with the same name
    ///
    async fn upsert_item<'a>(&self, item: &'a NewItemModel) -> Result<ItemModel>;
    async fn delete_item<'a>(&self, name: &'a str) -> Result<()>;
}

#[derive(Constructor)]
pub struct DbCatalogDataLayer {
    db: SqlitePool,
}

#[async_trait]
impl CatalogDataLayer for DbCatalogDataLayer {
    async fn get_store_by_name<'a>(&self, name: &'a str) -> Result<Option<StoreEntity>> {
        Ok(sqlx::query_as::<_, StoreEntity>("SELECT id, name FROM stores WHERE name = ?")
            .bind(name).fetch_optional(&self.db).await?)
    }
    async fn get_store_by_id(&self, id: i64) -> Result<Option<StoreEntity>> {
        Ok(sqlx::query_as::<_, StoreEntity>("SELECT id, name FROM stores WHERE id = ?")
            .bind(id).fetch_optional(&self.db).await?)
    }
    async fn get_all_stores(&self) -> Result<Vec<StoreEntity>> {
        Ok(sqlx::query_as::<_, StoreEntity>("SELECT id, name FROM stores ORDER BY id")
            .fetch_all(&self.db).await?)
    }
    async fn create_store<'a>(&self, name: &'a str) -> Result<Option<StoreEntity>> {
        let res = sqlx::query("INSERT INTO stores (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name).execute(&self.db).await?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_store_by_id(res.last_insert_rowid()).await
    }
    async fn delete_store<'a>(&self, name: &'a str) -> Result<()> {
        sqlx::query("DELETE FROM stores WHERE name = ?").bind(name).execute(&self.db).await?;
        Ok(())
    }

    async fn get_item_by_name<'a>(&self, name: &'a str) -> Result<Option<ItemModel>> {
        Ok(sqlx::query_as::<_, ItemModel>("SELECT id, name, price, store_id FROM items WHERE name = ?")
            .bind(name).fetch_optional(&self.db).await?)
    }
    async fn get_items_by_store(&self, store_id: i64) -> Result<Vec<ItemModel>> {
        Ok(sqlx::query_as::<_, ItemModel>("SELECT id, name, price, store_id FROM items WHERE store_id = ? ORDER BY id")
            .bind(store_id).fetch_all(&self.db).await?)
    }
    async fn get_all_items(&self) -> Result<Vec<ItemModel>> {
        Ok(sqlx::query_as::<_, ItemModel>("SELECT id, name, price, store_id FROM items ORDER BY id")
            .fetch_all(&self.db).await?)
    }
    async fn create_item<'a>(&self, item: &'a NewItemModel) -> Result<Option<ItemModel>> {
        let res = sqlx::query("
            INSERT INTO items (name, price, store_id) VALUES (?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            ")
            .bind(&item.name)
            .bind(item.price)
            .bind(item.store_id)
            .execute(&self.db).await?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_item_by_name(&item.name).await
    }
    async fn upsert_item<'a>(&self, item: &'a NewItemModel) -> Result<ItemModel> {
        sqlx::query("
            INSERT INTO items (name, price, store_id) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET price = excluded.price, store_id = excluded.store_id
            ")
            .bind(&item.name)
            .bind(item.price)
            .bind(item.store_id)
            .execute(&self.db).await?;

        self.get_item_by_name(&item.name).await?
            .ok_or_else(|| format!("item `{}` missing after upsert", item.name).into())
    }
    async fn delete_item<'a>(&self, name: &'a str) -> Result<()> {
        sqlx::query("DELETE FROM items WHERE name = ?").bind(name).execute(&self.db).await?;
        Ok(())
    }
}
