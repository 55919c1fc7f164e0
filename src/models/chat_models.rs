use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ChatModel {
    pub id: i64,
    pub text: String,
    pub username: String,
    pub publish_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewChatModel {
    pub text: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub username: String,
}
