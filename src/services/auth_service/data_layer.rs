use axum::async_trait;
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::{data_layer_error::Result, models::auth_models::UserModel};

#[async_trait]
pub trait AuthDataLayer : Send + Sync {
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>>;
    async fn get_user_by_username<'a>(&self, username: &'a str) -> Result<Option<UserModel>>;

    ///
    /// Inserts a new identity, returning `None` if the username is taken.
    /// The first identity ever created is given the admin role; deleting it
    /// does not free the role for later registrations.
    ///
    async fn create_user<'a>(&self, username: &'a str, pwd_hash: &'a str) -> Result<Option<UserModel>>;
    async fn update_pwd_hash<'a>(&self, user_id: i64, pwd_hash: &'a str) -> Result<bool>;
    async fn delete_user(&self, user_id: i64) -> Result<bool>;
}

#[derive(Constructor)]
pub struct DbAuthDataLayer {
    db: SqlitePool,
}

#[async_trait]
impl AuthDataLayer for DbAuthDataLayer {
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(
            "SELECT id, username, pwd_hash, role FROM users WHERE id = ?"
        ).bind(user_id).fetch_optional(&self.db).await?;

        Ok(user)
    }
    async fn get_user_by_username<'a>(&self, username: &'a str) -> Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(
            "SELECT id, username, pwd_hash, role FROM users WHERE username = ?"
        ).bind(username).fetch_optional(&self.db).await?;

        Ok(user)
    }
    async fn create_user<'a>(&self, username: &'a str, pwd_hash: &'a str) -> Result<Option<UserModel>> {
        // Role assignment and the uniqueness check happen in one statement.
        // `sqlite_sequence` gains its `users` row on the first successful insert
        // and keeps it after deletes, so admin is only ever granted once.
        let res = sqlx::query("
            INSERT INTO users (username, pwd_hash, role)
            VALUES (?, ?, CASE
                WHEN EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = 'users') THEN 'user'
                ELSE 'admin'
            END)
            ON CONFLICT(username) DO NOTHING
            ")
            .bind(username)
            .bind(pwd_hash)
            .execute(&self.db).await?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user_by_id(res.last_insert_rowid()).await
    }
    async fn update_pwd_hash<'a>(&self, user_id: i64, pwd_hash: &'a str) -> Result<bool> {
        let res = sqlx::query("UPDATE users SET pwd_hash = ? WHERE id = ?")
            .bind(pwd_hash)
            .bind(user_id)
            .execute(&self.db).await?;
        Ok(res.rows_affected() > 0)
    }
    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.db).await?;
        Ok(res.rows_affected() > 0)
    }
}
