use std::sync::Arc;

use axum::{Router, Json, middleware, routing::get, extract::{Query, State}, http::StatusCode};
use serde_json::{json, Value};

use crate::{
    middleware::auth_middleware::{auth_middleware, AdminContext, AuthContext, FreshContext, OptionalAuthContext},
    models::catalog_models::{ItemModel, NameQuery, NewItemModel, NewStoreModel, StoreModel},
    services::{auth_service::AuthService, catalog_service::{CatalogService, error::Result}},
};

pub fn routes(catalog_service: Arc<dyn CatalogService>, auth_service: Arc<dyn AuthService>) -> Router {
    Router::new()
        // Routes
        .route("/store", get(get_store).post(create_store).delete(delete_store))
        .route("/stores", get(list_stores))
        .route("/item", get(get_item).post(create_item).put(upsert_item).delete(delete_item))
        .route("/items", get(list_items))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth_service, auth_middleware))
        // State
        .with_state(catalog_service)
}

async fn get_store(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _ctx: AuthContext,
    Query(query): Query<NameQuery>,
) -> Result<Json<StoreModel>> {
    Ok(Json(catalog_service.get_store(&query.name).await?))
}

async fn create_store(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _ctx: AuthContext,
    Json(store): Json<NewStoreModel>,
) -> Result<(StatusCode, Json<StoreModel>)> {
    Ok((StatusCode::CREATED, Json(catalog_service.create_store(&store.name).await?)))
}

async fn delete_store(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _admin: AdminContext,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>> {
    catalog_service.delete_store(&query.name).await?;
    Ok(Json(json!({ "message": "Store deleted" })))
}

async fn list_stores(State(catalog_service): State<Arc<dyn CatalogService>>) -> Result<Json<Value>> {
    Ok(Json(json!({ "stores": catalog_service.list_stores().await? })))
}

async fn get_item(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _ctx: AuthContext,
    Query(query): Query<NameQuery>,
) -> Result<Json<ItemModel>> {
    Ok(Json(catalog_service.get_item(&query.name).await?))
}

async fn create_item(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _ctx: FreshContext,
    Json(item): Json<NewItemModel>,
) -> Result<(StatusCode, Json<ItemModel>)> {
    Ok((StatusCode::CREATED, Json(catalog_service.create_item(item).await?)))
}

async fn upsert_item(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _ctx: AuthContext,
    Json(item): Json<NewItemModel>,
) -> Result<Json<ItemModel>> {
    Ok(Json(catalog_service.upsert_item(item).await?))
}

async fn delete_item(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    _admin: AdminContext,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>> {
    catalog_service.delete_item(&query.name).await?;
    Ok(Json(json!({ "message": "Item deleted." })))
}

async fn list_items(
    State(catalog_service): State<Arc<dyn CatalogService>>,
    OptionalAuthContext(ctx): OptionalAuthContext,
) -> Result<Json<Value>> {
    let items = catalog_service.list_items().await?;

    if ctx.is_some() {
        return Ok(Json(json!({ "items": items })));
    }
    let names: Vec<String> = items.into_iter().map(|i| i.name).collect();
    Ok(Json(json!({
        "items": names,
        "message": "More data available if you log in.",
    })))
}
