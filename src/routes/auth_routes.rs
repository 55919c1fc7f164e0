use std::sync::Arc;

use axum::{
    Router, Json, middleware, TypedHeader,
    routing::post, extract::State, http::StatusCode,
    headers::{Authorization, authorization::Bearer},
};
use serde_json::{json, Value};

use crate::{
    middleware::auth_middleware::{auth_middleware, AnyTokenContext, RefreshContext},
    models::auth_models::{AccessTokenModel, CredentialsModel, UserDto},
    services::{auth_service::{AuthService, error::Result}, token_service::models::AuthTokensModel},
};

pub fn routes(auth_service: Arc<dyn AuthService>) -> Router {
    Router::new()
        // Routes
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth_service.clone(), auth_middleware))
        // State
        .with_state(auth_service)
}

async fn register(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(creds): Json<CredentialsModel>
) -> Result<(StatusCode, Json<UserDto>)> {
    let user = auth_service.register(&creds.username, &creds.password).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn login(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(creds): Json<CredentialsModel>
) -> Result<Json<AuthTokensModel>> {
    Ok(Json(auth_service.login(&creds.username, &creds.password).await?))
}

/// The extractor has already rejected invalid or revoked tokens; the raw
/// bearer is still needed to revoke it.
async fn logout(
    State(auth_service): State<Arc<dyn AuthService>>,
    _ctx: AnyTokenContext,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>> {
    auth_service.logout(bearer.token()).await?;
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

async fn refresh(
    State(auth_service): State<Arc<dyn AuthService>>,
    _ctx: RefreshContext,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<AccessTokenModel>> {
    let access_token = auth_service.refresh(bearer.token()).await?;
    Ok(Json(AccessTokenModel { access_token }))
}
