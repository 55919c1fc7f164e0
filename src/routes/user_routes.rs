use std::sync::Arc;

use axum::{Router, Json, middleware, routing::get, extract::{Path, State}};
use serde_json::{json, Value};

use crate::{
    middleware::auth_middleware::{auth_middleware, AuthContext, FreshContext},
    models::auth_models::{PasswordModel, UserDto},
    services::auth_service::{AuthService, error::{AuthServiceError, Result}},
};

pub fn routes(auth_service: Arc<dyn AuthService>) -> Router {
    Router::new()
        // Routes
        .route("/user/:id", get(get_user).put(update_user).delete(delete_user))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth_service.clone(), auth_middleware))
        // State
        .with_state(auth_service)
}

/// A user may only change themselves, unless they are an admin
fn ensure_may_modify(ctx: &AuthContext, user_id: i64) -> Result<()> {
    if ctx.user_id != user_id && !ctx.is_admin {
        return Err(AuthServiceError::Forbidden(user_id));
    }
    Ok(())
}

async fn get_user(
    State(auth_service): State<Arc<dyn AuthService>>,
    Path(user_id): Path<i64>
) -> Result<Json<UserDto>> {
    Ok(Json(auth_service.get_user(user_id).await?.into()))
}

async fn update_user(
    State(auth_service): State<Arc<dyn AuthService>>,
    FreshContext(ctx): FreshContext,
    Path(user_id): Path<i64>,
    Json(body): Json<PasswordModel>,
) -> Result<Json<Value>> {
    ensure_may_modify(&ctx, user_id)?;
    auth_service.update_password(user_id, &body.password).await?;
    Ok(Json(json!({ "message": "User updated." })))
}

async fn delete_user(
    State(auth_service): State<Arc<dyn AuthService>>,
    FreshContext(ctx): FreshContext,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>> {
    ensure_may_modify(&ctx, user_id)?;
    auth_service.delete_user(user_id).await?;
    Ok(Json(json!({ "message": "User deleted." })))
}
