pub mod error;
pub mod data_layer;

use std::sync::Arc;

use argon2::Config;
use axum::async_trait;
use derive_more::Constructor;
use log::info;
use rand::{rngs::OsRng, Rng};

use crate::models::auth_models::UserModel;

use self::{error::{Result, AuthServiceError}, data_layer::AuthDataLayer};

use super::{
    blacklist_service::BlacklistService,
    token_service::{TokenService, error::TokenError, models::{AuthTokensModel, Claims, TokenType}},
};

const SALT_LENGTH: usize = 16;

///
/// Identity service: registers users, trades credentials for token pairs
/// and tracks which tokens are still acceptable.
///
#[async_trait]
pub trait AuthService: Send + Sync {
    ///
    /// Creates a new identity. Returns `AuthServiceError::DuplicateIdentity`
    /// if the username is already taken
    ///
    async fn register(&self, username: &str, pwd: &str) -> Result<UserModel>;
    ///
    /// Verifies the credentials and issues a fresh access token plus a refresh token
    ///
    async fn login(&self, username: &str, pwd: &str) -> Result<AuthTokensModel>;
    ///
    /// Trades a refresh token for a new, non-fresh access token carrying
    /// the same identity and admin claim
    ///
    async fn refresh(&self, refresh_token: &str) -> Result<String>;
    ///
    /// Revokes an access or refresh token. Revoking twice is not an error
    ///
    async fn logout(&self, token: &str) -> Result<()>;
    ///
    /// Verifies signature, expiry and revocation of any issued token
    ///
    async fn authenticate(&self, token: &str) -> Result<Claims>;

    async fn get_user(&self, user_id: i64) -> Result<UserModel>;
    async fn update_password(&self, user_id: i64, pwd: &str) -> Result<()>;
    async fn delete_user(&self, user_id: i64) -> Result<()>;
}

#[derive(Clone, Constructor)]
pub struct CoreAuthService {
    data_layer: Arc<dyn AuthDataLayer>,
    token_service: Arc<dyn TokenService>,
    blacklist: Arc<dyn BlacklistService>,
}

#[async_trait]
impl AuthService for CoreAuthService {
    async fn register(&self, username: &str, pwd: &str) -> Result<UserModel> {
        let pwd_hash = hash_password(pwd)?;
        let user = self.data_layer.create_user(username, &pwd_hash).await?
            .ok_or_else(|| AuthServiceError::DuplicateIdentity(username.to_string()))?;

        info!("Registered user {} ({:?})", user.id, user.role);
        Ok(user)
    }

    async fn login(&self, username: &str, pwd: &str) -> Result<AuthTokensModel> {
        // Get the user associated with the username (if exists)
        let user = self.data_layer.get_user_by_username(username).await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        // Verify that the password given matches the user's
        if !argon2::verify_encoded(&user.pwd_hash, pwd.as_bytes())? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        // The admin claim is resolved from the stored role, once, here
        let is_admin = user.is_admin();
        Ok(AuthTokensModel {
            access_token: self.token_service.generate_access_token(user.id, is_admin, true)?,
            refresh_token: self.token_service.generate_refresh_token(user.id, is_admin)?,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self.authenticate(refresh_token).await?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::Invalid("Only refresh tokens are allowed".to_string()).into());
        }

        Ok(self.token_service.generate_access_token(claims.sub, claims.is_admin, false)?)
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let claims = self.token_service.verify_token(token)?;
        self.blacklist.revoke(&claims.jti, claims.exp).await?;

        info!("Revoked {:?} token {} of user {}", claims.token_type, claims.jti, claims.sub);
        Ok(())
    }

    async fn authenticate(&self, token: &str) -> Result<Claims> {
        let claims = self.token_service.verify_token(token)?;
        if self.blacklist.is_revoked(&claims.jti).await? {
            return Err(TokenError::Revoked.into());
        }
        Ok(claims)
    }

    async fn get_user(&self, user_id: i64) -> Result<UserModel> {
        self.data_layer.get_user_by_id(user_id).await?
            .ok_or(AuthServiceError::UserNotFound(user_id))
    }

    async fn update_password(&self, user_id: i64, pwd: &str) -> Result<()> {
        let pwd_hash = hash_password(pwd)?;
        if !self.data_layer.update_pwd_hash(user_id, &pwd_hash).await? {
            return Err(AuthServiceError::UserNotFound(user_id));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<()> {
        if !self.data_layer.delete_user(user_id).await? {
            return Err(AuthServiceError::UserNotFound(user_id));
        }
        info!("Deleted user {user_id}");
        Ok(())
    }
}

///
/// Hashes `pwd` with argon2 and a random salt of `SALT_LENGTH` bytes
///
fn hash_password(pwd: &str) -> Result<String> {
    let salt: [u8; SALT_LENGTH] = OsRng.gen();
    Ok(argon2::hash_encoded(pwd.as_bytes(), &salt, &Config::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_service, memory_pool};

    #[tokio::test]
    async fn test_duplicate_registration() {
        let svc = auth_service(memory_pool().await);

        svc.register("alice", "pwd").await.unwrap();
        let second = svc.register("alice", "other").await;

        assert!(matches!(second, Err(AuthServiceError::DuplicateIdentity(name)) if name == "alice"));
        // The original password still logs in, so the row was untouched
        assert!(svc.login("alice", "pwd").await.is_ok());
    }

    #[tokio::test]
    async fn test_first_identity_is_admin() {
        let svc = auth_service(memory_pool().await);

        let first = svc.register("admin", "pwd").await.unwrap();
        let second = svc.register("shopper", "pwd").await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let tokens = svc.login("admin", "pwd").await.unwrap();
        assert!(svc.authenticate(&tokens.access_token).await.unwrap().is_admin);

        let tokens = svc.login("shopper", "pwd").await.unwrap();
        assert!(!svc.authenticate(&tokens.access_token).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_admin_role_is_not_reassigned_after_delete() {
        let svc = auth_service(memory_pool().await);
        svc.register("admin", "pwd").await.unwrap();
        svc.delete_user(1).await.unwrap();

        let next = svc.register("mallory", "pwd").await.unwrap();
        assert_eq!(next.id, 2);
        assert!(!next.is_admin());

        let tokens = svc.login("mallory", "pwd").await.unwrap();
        assert!(!svc.authenticate(&tokens.access_token).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let svc = auth_service(memory_pool().await);
        svc.register("alice", "pwd").await.unwrap();

        assert!(matches!(svc.login("alice", "nope").await, Err(AuthServiceError::InvalidCredentials)));
        assert!(matches!(svc.login("bob", "pwd").await, Err(AuthServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_issues_fresh_access_token() {
        let svc = auth_service(memory_pool().await);
        svc.register("alice", "pwd").await.unwrap();

        let tokens = svc.login("alice", "pwd").await.unwrap();
        let access = svc.authenticate(&tokens.access_token).await.unwrap();
        let refresh = svc.authenticate(&tokens.refresh_token).await.unwrap();

        assert_eq!(access.token_type, TokenType::Access);
        assert!(access.fresh);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(access.sub, refresh.sub);
    }

    #[tokio::test]
    async fn test_refresh_keeps_admin_claim() {
        let svc = auth_service(memory_pool().await);
        for name in ["admin", "shopper"] {
            svc.register(name, "pwd").await.unwrap();
            let tokens = svc.login(name, "pwd").await.unwrap();
            let original = svc.authenticate(&tokens.access_token).await.unwrap();

            let refreshed = svc.refresh(&tokens.refresh_token).await.unwrap();
            let refreshed = svc.authenticate(&refreshed).await.unwrap();

            assert_eq!(refreshed.is_admin, original.is_admin);
            assert_eq!(refreshed.sub, original.sub);
            assert!(!refreshed.fresh);
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let svc = auth_service(memory_pool().await);
        svc.register("alice", "pwd").await.unwrap();
        let tokens = svc.login("alice", "pwd").await.unwrap();

        let res = svc.refresh(&tokens.access_token).await;
        assert!(matches!(res, Err(AuthServiceError::Token(TokenError::Invalid(_)))));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let svc = auth_service(memory_pool().await);
        svc.register("alice", "pwd").await.unwrap();
        let tokens = svc.login("alice", "pwd").await.unwrap();

        svc.logout(&tokens.access_token).await.unwrap();
        svc.logout(&tokens.access_token).await.unwrap();

        let res = svc.authenticate(&tokens.access_token).await;
        assert!(matches!(res, Err(AuthServiceError::Token(TokenError::Revoked))));
        // The refresh token was not part of the logout
        assert!(svc.authenticate(&tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_cannot_refresh() {
        let svc = auth_service(memory_pool().await);
        svc.register("alice", "pwd").await.unwrap();
        let tokens = svc.login("alice", "pwd").await.unwrap();

        svc.logout(&tokens.refresh_token).await.unwrap();

        let res = svc.refresh(&tokens.refresh_token).await;
        assert!(matches!(res, Err(AuthServiceError::Token(TokenError::Revoked))));
    }

    #[tokio::test]
    async fn test_token_outlives_identity_changes() {
        let svc = auth_service(memory_pool().await);
        let user = svc.register("alice", "pwd").await.unwrap();
        let tokens = svc.login("alice", "pwd").await.unwrap();

        svc.delete_user(user.id).await.unwrap();

        assert!(svc.authenticate(&tokens.access_token).await.is_ok());
        assert!(matches!(svc.get_user(user.id).await, Err(AuthServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_password() {
        let svc = auth_service(memory_pool().await);
        let user = svc.register("alice", "pwd").await.unwrap();

        svc.update_password(user.id, "new-pwd").await.unwrap();

        assert!(svc.login("alice", "pwd").await.is_err());
        assert!(svc.login("alice", "new-pwd").await.is_ok());
        assert!(matches!(svc.update_password(99, "x").await, Err(AuthServiceError::UserNotFound(99))));
    }
}
