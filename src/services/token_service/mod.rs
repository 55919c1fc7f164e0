pub mod error;
pub mod models;
pub mod settings;

use chrono::{Duration, Utc};
use derive_more::Constructor;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use self::{settings::TokenSettings, error::{Result, TokenError}, models::{Claims, TokenType}};

pub trait TokenService: Send + Sync {
    ///
    /// Signs a short-lived access token for `user_id`. `fresh` is only `true`
    /// when the caller has just presented the user's password.
    ///
    fn generate_access_token(&self, user_id: i64, is_admin: bool, fresh: bool) -> Result<String>;

    ///
    /// Signs a long-lived refresh token for `user_id`, which can only be
    /// traded for new access tokens.
    ///
    fn generate_refresh_token(&self, user_id: i64, is_admin: bool) -> Result<String>;

    ///
    /// Verifies the signature and expiry of `token`, returning its claims.
    /// Revocation is not checked here.
    ///
    fn verify_token(&self, token: &str) -> Result<Claims>;
}

#[derive(Clone, Constructor)]
pub struct CoreTokenService {
    settings: TokenSettings
}

impl CoreTokenService {
    fn key(&self) -> Result<Hmac<Sha256>> {
        Hmac::new_from_slice(self.settings.jwt_secret.as_bytes())
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn sign(&self, user_id: i64, is_admin: bool, fresh: bool, token_type: TokenType, lifetime_s: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            jti: Uuid::new_v4().to_string(),
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime_s)).timestamp(),
            token_type,
            fresh,
            is_admin,
        };

        claims.sign_with_key(&self.key()?).map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenService for CoreTokenService {
    fn generate_access_token(&self, user_id: i64, is_admin: bool, fresh: bool) -> Result<String> {
        self.sign(user_id, is_admin, fresh, TokenType::Access, self.settings.jwt_lifetime_s)
    }

    fn generate_refresh_token(&self, user_id: i64, is_admin: bool) -> Result<String> {
        self.sign(user_id, is_admin, false, TokenType::Refresh, self.settings.refr_token_lifetime_s)
    }

    fn verify_token(&self, token: &str) -> Result<Claims> {
        // Verify the JWT using the hash key
        let claims: Claims = token.verify_with_key(&self.key()?)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        // Reject the token once its expiry has passed
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
