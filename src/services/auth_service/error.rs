use axum::{response::{IntoResponse, Response}, http::StatusCode, Json};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::{data_layer_error::DataLayerError, services::token_service::error::TokenError};

pub type Result<T> = std::result::Result<T, AuthServiceError>;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("An internal server error has occurred")]
    DataLayerError(DataLayerError),
    #[error("An internal server error has occurred")]
    HashError(argon2::Error),
    #[error("A user with the username `{0}` already exists")]
    DuplicateIdentity(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Token(TokenError),
    #[error("User not found")]
    UserNotFound(i64),
    #[error("Not allowed to modify user {0}")]
    Forbidden(i64),
}

impl From<DataLayerError> for AuthServiceError {
    fn from(e: DataLayerError) -> Self {
        AuthServiceError::DataLayerError(e)
    }
}

impl From<TokenError> for AuthServiceError {
    fn from(e: TokenError) -> Self {
        AuthServiceError::Token(e)
    }
}

impl From<argon2::Error> for AuthServiceError {
    fn from(e: argon2::Error) -> Self {
        AuthServiceError::HashError(e)
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthServiceError::Token(e) => return e.clone().into_response(),
            AuthServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthServiceError::HashError(e) => {
                error!("{:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthServiceError::DuplicateIdentity(_) => StatusCode::BAD_REQUEST,
            AuthServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
