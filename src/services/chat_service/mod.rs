pub mod error;
pub mod data_layer;

use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use derive_more::Constructor;

use crate::models::chat_models::ChatModel;

use self::{error::{ChatServiceError, Result}, data_layer::ChatDataLayer};

///
/// Persists the conversation messages users send, including image prompts
///
#[async_trait]
pub trait ChatService : Send + Sync {
    ///
    /// Stores `text` for `username`, stamped with the current time
    ///
    async fn create_chat(&self, text: &str, username: &str) -> Result<ChatModel>;
    async fn latest_chat(&self, username: &str) -> Result<ChatModel>;
    ///
    /// All chats, oldest first, optionally restricted to one user
    ///
    async fn chat_history(&self, username: Option<&str>) -> Result<Vec<ChatModel>>;
}

#[derive(Constructor)]
pub struct CoreChatService {
    data_layer: Arc<dyn ChatDataLayer>,
}

#[async_trait]
impl ChatService for CoreChatService {
    async fn create_chat(&self, text: &str, username: &str) -> Result<ChatModel> {
        Ok(self.data_layer.create_chat(text, username, Utc::now()).await?)
    }

    async fn latest_chat(&self, username: &str) -> Result<ChatModel> {
        self.data_layer.get_latest_chat(username).await?
            .ok_or_else(|| ChatServiceError::NoChats(username.to_string()))
    }

    async fn chat_history(&self, username: Option<&str>) -> Result<Vec<ChatModel>> {
        Ok(self.data_layer.get_chats(username).await?)
    }
}
