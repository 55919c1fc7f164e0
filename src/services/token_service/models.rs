use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

///
/// Claims carried by every issued JWT. `is_admin` is fixed when the token
/// is minted and never re-read from the identity afterwards.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub jti: String,
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub fresh: bool,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthTokensModel {
    pub access_token: String,
    pub refresh_token: String,
}
