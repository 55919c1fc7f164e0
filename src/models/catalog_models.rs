use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ItemModel {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub store_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItemModel {
    pub name: String,
    pub price: f64,
    pub store_id: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreEntity {
    pub id: i64,
    pub name: String,
}

///
/// A store together with every item it lists
///
#[derive(Debug, Clone, Serialize)]
pub struct StoreModel {
    pub id: i64,
    pub name: String,
    pub items: Vec<ItemModel>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewStoreModel {
    pub name: String,
}
