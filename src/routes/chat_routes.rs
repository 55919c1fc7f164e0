use std::sync::Arc;

use axum::{Router, Json, routing::get, extract::{Query, State}, http::StatusCode};
use serde_json::{json, Value};

use crate::{
    models::chat_models::{ChatModel, ChatQuery, NewChatModel, UsernameQuery},
    services::chat_service::{ChatService, error::Result},
};

pub fn routes(chat_service: Arc<dyn ChatService>) -> Router {
    Router::new()
        // Routes
        .route("/chat", get(latest_chat).post(create_chat))
        .route("/chathistory", get(chat_history))
        // State
        .with_state(chat_service)
}

async fn create_chat(
    State(chat_service): State<Arc<dyn ChatService>>,
    Json(chat): Json<NewChatModel>,
) -> Result<(StatusCode, Json<ChatModel>)> {
    Ok((StatusCode::CREATED, Json(chat_service.create_chat(&chat.text, &chat.username).await?)))
}

async fn latest_chat(
    State(chat_service): State<Arc<dyn ChatService>>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ChatModel>> {
    Ok(Json(chat_service.latest_chat(&query.username).await?))
}

async fn chat_history(
    State(chat_service): State<Arc<dyn ChatService>>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<Value>> {
    let chats = chat_service.chat_history(query.username.as_deref()).await?;
    Ok(Json(json!({ "chats": chats })))
}
