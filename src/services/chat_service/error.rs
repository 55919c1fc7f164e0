use axum::{response::{IntoResponse, Response}, http::StatusCode, Json};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, ChatServiceError>;

#[derive(Debug, Error)]
pub enum ChatServiceError {
    #[error("Internal server error")]
    DataLayerError(DataLayerError),
    #[error("No chat found for user `{0}`")]
    NoChats(String),
}

impl From<DataLayerError> for ChatServiceError {
    fn from(e: DataLayerError) -> Self {
        ChatServiceError::DataLayerError(e)
    }
}

impl IntoResponse for ChatServiceError {
    fn into_response(self) -> Response {
        match self {
            ChatServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "An internal server error occured" }))).into_response()
            },
            _ => (StatusCode::NOT_FOUND, Json(json!({ "message": self.to_string() }))).into_response()
        }
    }
}
