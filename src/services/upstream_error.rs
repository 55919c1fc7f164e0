use axum::{response::{IntoResponse, Response}, http::StatusCode, Json};
use log::error;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpstreamError>;

///
/// Failure of an outbound call to a third-party service (NLU, completion
/// or image generation). Never retried.
///
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    ///
    /// The upstream's own status when it answered, otherwise a gateway error
    ///
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Status { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            UpstreamError::Request(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        error!("{:?}", self);
        let status = self.status_code();
        (status, Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))).into_response()
    }
}

///
/// Turns a non-success response into `UpstreamError::Status`, keeping the body
///
pub async fn ensure_success(res: reqwest::Response) -> Result<reqwest::Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(UpstreamError::Status { status, body })
}
