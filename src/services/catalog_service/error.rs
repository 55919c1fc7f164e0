use axum::{response::{IntoResponse, Response}, http::StatusCode, Json};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, CatalogServiceError>;

#[derive(Debug, Error)]
pub enum CatalogServiceError {
    #[error("Internal server error")]
    DataLayerError(DataLayerError),
    #[error("A store with name '{0}' already exists.")]
    StoreExists(String),
    #[error("Store not found")]
    StoreNotFound(String),
    #[error("No store with id {0}")]
    UnknownStore(i64),
    #[error("An item with name '{0}' already exists.")]
    ItemExists(String),
    #[error("Item not found")]
    ItemNotFound(String),
}

impl From<DataLayerError> for CatalogServiceError {
    fn from(e: DataLayerError) -> Self {
        CatalogServiceError::DataLayerError(e)
    }
}

impl IntoResponse for CatalogServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CatalogServiceError::StoreNotFound(_) | CatalogServiceError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
