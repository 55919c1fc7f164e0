use std::sync::Arc;

use axum::{async_trait, extract::{FromRequestParts, State}, http::{request::Parts, Request}, TypedHeader, headers::{Authorization, authorization::Bearer}, middleware::Next, response::{IntoResponse, Response}};
use log::error;

use crate::services::{
    auth_service::{AuthService, error::AuthServiceError},
    token_service::{error::TokenError, models::{Claims, TokenType}},
};

///
/// The verified identity behind the bearer token of a request
///
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub is_admin: bool,
    pub fresh: bool,
    pub jti: String,
    pub expires: i64,
    pub token_type: TokenType,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            is_admin: claims.is_admin,
            fresh: claims.fresh,
            jti: claims.jti,
            expires: claims.exp,
            token_type: claims.token_type,
        }
    }
}

/// Access token that was minted by a password login.
#[derive(Clone, Debug)]
pub struct FreshContext(pub AuthContext);

/// Access token carrying the admin claim.
#[derive(Clone, Debug)]
pub struct AdminContext(pub AuthContext);

/// Refresh token.
#[derive(Clone, Debug)]
pub struct RefreshContext(pub AuthContext);

/// Either token type; used by logout.
#[derive(Clone, Debug)]
pub struct AnyTokenContext(pub AuthContext);

/// Access token if one was sent, `None` when the header is absent.
#[derive(Clone, Debug)]
pub struct OptionalAuthContext(pub Option<AuthContext>);

///
/// Result of checking the bearer token, left in the request extensions
/// by `auth_middleware` for the extractors above
///
#[derive(Clone)]
struct AuthOutcome(Result<AuthContext, TokenError>);

fn outcome(parts: &Parts) -> Result<AuthContext, TokenError> {
    match parts.extensions.get::<AuthOutcome>() {
        Some(AuthOutcome(res)) => res.clone(),
        None => Err(TokenError::Missing),
    }
}

fn require_access(ctx: AuthContext) -> Result<AuthContext, TokenError> {
    if ctx.token_type != TokenType::Access {
        return Err(TokenError::Invalid("Only access tokens are allowed".to_string()));
    }
    Ok(ctx)
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_access(outcome(parts)?)
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for FreshContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = require_access(outcome(parts)?)?;
        if !ctx.fresh {
            return Err(TokenError::FreshRequired);
        }
        Ok(FreshContext(ctx))
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for AdminContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = require_access(outcome(parts)?)?;
        if !ctx.is_admin {
            return Err(TokenError::AdminRequired);
        }
        Ok(AdminContext(ctx))
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for RefreshContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = outcome(parts)?;
        if ctx.token_type != TokenType::Refresh {
            return Err(TokenError::Invalid("Only refresh tokens are allowed".to_string()));
        }
        Ok(RefreshContext(ctx))
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for AnyTokenContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AnyTokenContext(outcome(parts)?))
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for OptionalAuthContext {
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match outcome(parts) {
            Ok(ctx) => Ok(OptionalAuthContext(Some(require_access(ctx)?))),
            Err(TokenError::Missing) => Ok(OptionalAuthContext(None)),
            Err(e) => Err(e),
        }
    }
}

///
/// Verifies the bearer token (if any) against the `AuthService`, including
/// the blacklist, and records the outcome for the handler's extractors.
/// Never rejects on its own, so public routes can share the layer.
///
pub async fn auth_middleware<B : Send> (
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    State(auth_service): State<Arc<dyn AuthService>>,
    mut request: Request<B>,
    next: Next<B>
) -> Response {
    if let Some(bearer) = bearer {
        let result = match auth_service.authenticate(bearer.token()).await {
            Ok(claims) => Ok(AuthContext::from(claims)),
            Err(AuthServiceError::Token(e)) => Err(e),
            Err(e) => {
                error!("Token check failed: {:?}", e);
                return e.into_response();
            }
        };
        request.extensions_mut().insert(AuthOutcome(result));
    }
    next.run(request).await
}
