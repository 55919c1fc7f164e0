use axum::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::{data_layer_error::Result, models::chat_models::ChatModel};

#[async_trait]
pub trait ChatDataLayer : Send + Sync {
    async fn create_chat<'a>(&self, text: &'a str, username: &'a str, publish_date: DateTime<Utc>) -> Result<ChatModel>;
    async fn get_latest_chat<'a>(&self, username: &'a str) -> Result<Option<ChatModel>>;
    async fn get_chats<'a>(&self, username: Option<&'a str>) -> Result<Vec<ChatModel>>;
}

#[derive(Constructor)]
pub struct DbChatDataLayer {
    db: SqlitePool,
}

#[async_trait]
impl ChatDataLayer for DbChatDataLayer {
    async fn create_chat<'a>(&self, text: &'a str, username: &'a str, publish_date: DateTime<Utc>) -> Result<ChatModel> {
        let res = sqlx::query("INSERT INTO chats (text, username, publish_date) VALUES (?, ?, ?)")
            .bind(text)
            .bind(username)
            .bind(publish_date)
            .execute(&self.db).await?;

        Ok(ChatModel {
            id: res.last_insert_rowid(),
            text: text.to_string(),
            username: username.to_string(),
            publish_date,
        })
    }
    async fn get_latest_chat<'a>(&self, username: &'a str) -> Result<Option<ChatModel>> {
        Ok(sqlx::query_as::<_, ChatModel>("
            SELECT id, text, username, publish_date FROM chats
            WHERE username = ? ORDER BY id DESC LIMIT 1
            ")
            .bind(username)
            .fetch_optional(&self.db).await?)
    }
    async fn get_chats<'a>(&self, username: Option<&'a str>) -> Result<Vec<ChatModel>> {
        let chats = match username {
            Some(username) => sqlx::query_as::<_, ChatModel>("
                SELECT id, text, username, publish_date FROM chats
                WHERE username = ? ORDER BY id
                ")
                .bind(username)
                .fetch_all(&self.db).await?,
            None => sqlx::query_as::<_, ChatModel>(
                "SELECT id, text, username, publish_date FROM chats ORDER BY id"
            ).fetch_all(&self.db).await?,
        };
        Ok(chats)
    }
}
