use std::collections::HashMap;

use axum::async_trait;
use derive_more::Constructor;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::data_layer_error::Result;

///
/// Storage for revoked token identifiers, each paired with the unix
/// timestamp at which the token itself expires.
///
#[async_trait]
pub trait BlacklistDataLayer: Send + Sync {
    async fn insert_revoked<'a>(&self, jti: &'a str, expires: i64) -> Result<()>;
    async fn get_revoked_expiry<'a>(&self, jti: &'a str) -> Result<Option<i64>>;
    async fn delete_revoked<'a>(&self, jti: &'a str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryBlacklistDataLayer {
    revoked: RwLock<HashMap<String, i64>>,
}

#[async_trait]
impl BlacklistDataLayer for MemoryBlacklistDataLayer {
    async fn insert_revoked<'a>(&self, jti: &'a str, expires: i64) -> Result<()> {
        self.revoked.write().await.insert(jti.to_string(), expires);
        Ok(())
    }
    async fn get_revoked_expiry<'a>(&self, jti: &'a str) -> Result<Option<i64>> {
        Ok(self.revoked.read().await.get(jti).copied())
    }
    async fn delete_revoked<'a>(&self, jti: &'a str) -> Result<()> {
        self.revoked.write().await.remove(jti);
        Ok(())
    }
}

#[derive(Constructor)]
pub struct DbBlacklistDataLayer {
    db: SqlitePool,
}

#[async_trait]
impl BlacklistDataLayer for DbBlacklistDataLayer {
    async fn insert_revoked<'a>(&self, jti: &'a str, expires: i64) -> Result<()> {
        sqlx::query("
            INSERT INTO revoked_tokens (jti, expires) VALUES (?, ?)
            ON CONFLICT(jti) DO NOTHING
            ")
            .bind(jti)
            .bind(expires)
            .execute(&self.db).await?;
        Ok(())
    }
    async fn get_revoked_expiry<'a>(&self, jti: &'a str) -> Result<Option<i64>> {
        let expires = sqlx::query_scalar::<_, i64>("SELECT expires FROM revoked_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.db).await?;
        Ok(expires)
    }
    async fn delete_revoked<'a>(&self, jti: &'a str) -> Result<()> {
        sqlx::query("DELETE FROM revoked_tokens WHERE jti = ?")
            .bind(jti)
            .execute(&self.db).await?;
        Ok(())
    }
}
