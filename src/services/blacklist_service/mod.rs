pub mod data_layer;

use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use derive_more::Constructor;
use log::debug;

use crate::data_layer_error::Result;

use self::data_layer::BlacklistDataLayer;

///
/// Process-wide record of revoked token identifiers (`jti`s), consulted
/// on every authenticated request.
///
#[async_trait]
pub trait BlacklistService: Send + Sync {
    ///
    /// Revokes the token identified by `jti`. `expires` is the token's own
    /// expiry; revoking the same token twice is a no-op.
    ///
    async fn revoke(&self, jti: &str, expires: i64) -> Result<()>;
    ///
    /// Returns `true` if `jti` has been revoked and has not yet expired.
    ///
    async fn is_revoked(&self, jti: &str) -> Result<bool>;
}

#[derive(Clone, Constructor)]
pub struct CoreBlacklistService {
    data_layer: Arc<dyn BlacklistDataLayer>,
}

#[async_trait]
impl BlacklistService for CoreBlacklistService {
    async fn revoke(&self, jti: &str, expires: i64) -> Result<()> {
        self.data_layer.insert_revoked(jti, expires).await
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool> {
        match self.data_layer.get_revoked_expiry(jti).await? {
            None => Ok(false),
            // Past its own expiry the token is rejected as expired before the
            // blacklist is ever consulted, so the entry can go
            Some(expires) if expires <= Utc::now().timestamp() => {
                debug!("Sweeping expired blacklist entry {jti}");
                self.data_layer.delete_revoked(jti).await?;
                Ok(false)
            }
            Some(_) => Ok(true),
        }
    }
}
