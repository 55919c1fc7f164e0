pub mod error;
pub mod data_layer;

use std::sync::Arc;

use axum::async_trait;
use derive_more::Constructor;
use log::info;

use crate::models::catalog_models::{ItemModel, NewItemModel, StoreEntity, StoreModel};

use self::{error::{CatalogServiceError, Result}, data_layer::CatalogDataLayer};

///
/// Stores and the items they list
///
#[async_trait]
pub trait CatalogService : Send + Sync {
    async fn get_store(&self, name: &str) -> Result<StoreModel>;
    async fn create_store(&self, name: &str) -> Result<StoreModel>;
    ///
    /// Removes the store if it exists. Items listed under it are kept.
    ///
    async fn delete_store(&self, name: &str) -> Result<()>;
    async fn list_stores(&self) -> Result<Vec<StoreModel>>;

    async fn get_item(&self, name: &str) -> Result<ItemModel>;
    ///
    /// Adds a new item to an existing store. Returns
    /// `CatalogServiceError::ItemExists` if the name is taken
    ///
    async fn create_item(&self, item: NewItemModel) -> Result<ItemModel>;
    async fn upsert_item(&self, item: NewItemModel) -> Result<ItemModel>;
    async fn delete_item(&self, name: &str) -> Result<()>;
    async fn list_items(&self) -> Result<Vec<ItemModel>>;
}

#[derive(Constructor)]
pub struct CoreCatalogService {
    data_layer: Arc<dyn CatalogDataLayer>,
}

impl CoreCatalogService {
    async fn with_items(&self, store: StoreEntity) -> Result<StoreModel> {
        let items = self.data_layer.get_items_by_store(store.id).await?;
        Ok(StoreModel { id: store.id, name: store.name, items })
    }

    async fn ensure_store_exists(&self, store_id: i64) -> Result<()> {
        match self.data_layer.get_store_by_id(store_id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogServiceError::UnknownStore(store_id)),
        }
    }
}

#[async_trait]
impl CatalogService for CoreCatalogService {
    async fn get_store(&self, name: &str) -> Result<StoreModel> {
        let store = self.data_layer.get_store_by_name(name).await?
            .ok_or_else(|| CatalogServiceError::StoreNotFound(name.to_string()))?;
        self.with_items(store).await
    }

    async fn create_store(&self, name: &str) -> Result<StoreModel> {
        let store = self.data_layer.create_store(name).await?
            .ok_or_else(|| CatalogServiceError::StoreExists(name.to_string()))?;

        info!("Created store {} `{}`", store.id, store.name);
        Ok(StoreModel { id: store.id, name: store.name, items: Vec::new() })
    }

    async fn delete_store(&self, name: &str) -> Result<()> {
        Ok(self.data_layer.delete_store(name).await?)
    }

    async fn list_stores(&self) -> Result<Vec<StoreModel>> {
        let mut stores = Vec::new();
        for store in self.data_layer.get_all_stores().await? {
            stores.push(self.with_items(store).await?);
        }
        Ok(stores)
    }

    async fn get_item(&self, name: &str) -> Result<ItemModel> {
        self.data_layer.get_item_by_name(name).await?
            .ok_or_else(|| CatalogServiceError::ItemNotFound(name.to_string()))
    }

    async fn create_item(&self, item: NewItemModel) -> Result<ItemModel> {
        self.ensure_store_exists(item.store_id).await?;
        self.data_layer.create_item(&item).await?
            .ok_or(CatalogServiceError::ItemExists(item.name))
    }

    async fn upsert_item(&self, item: NewItemModel) -> Result<ItemModel> {
        self.ensure_store_exists(item.store_id).await?;
        Ok(self.data_layer.upsert_item(&item).await?)
    }

    async fn delete_item(&self, name: &str) -> Result<()> {
        Ok(self.data_layer.delete_item(name).await?)
    }

    async fn list_items(&self) -> Result<Vec<ItemModel>> {
        Ok(self.data_layer.get_all_items().await?)
    }
}
