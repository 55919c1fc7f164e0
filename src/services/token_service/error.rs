use axum::{response::{IntoResponse, Response}, http::StatusCode, Json};
use log::warn;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TokenError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("The token has expired.")]
    Expired,
    #[error("The token has been revoked.")]
    Revoked,
    #[error("Signature verification failed. {0}")]
    Invalid(String),
    #[error("Request doesn't contain an access token.")]
    Missing,
    #[error("The token is not fresh.")]
    FreshRequired,
    #[error("Admin privilege required.")]
    AdminRequired,
    #[error("Token could not be signed: {0}")]
    Signing(String),
}

impl TokenError {
    ///
    /// Machine-readable code returned in the `error` field of the response body
    ///
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::Expired => "token_expired",
            TokenError::Revoked => "token_revoked",
            TokenError::Invalid(_) | TokenError::Signing(_) => "invalid_token",
            TokenError::Missing => "authorization_required",
            TokenError::FreshRequired => "fresh_token_required",
            TokenError::AdminRequired => "admin_privilege_required",
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        if let TokenError::Signing(e) = &self {
            warn!("{:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "description": "An internal server error has occurred",
                "error": "internal_error",
            }))).into_response();
        }

        (StatusCode::UNAUTHORIZED, Json(json!({
            "description": self.to_string(),
            "error": self.code(),
        }))).into_response()
    }
}
