use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserModel {
    pub id: i64,
    pub username: String,
    pub pwd_hash: String,
    pub role: Role,
}

impl UserModel {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

///
/// Public view of an identity, without its password hash
///
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<UserModel> for UserDto {
    fn from(user: UserModel) -> Self {
        Self { id: user.id, username: user.username, role: user.role }
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsModel {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordModel {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenModel {
    pub access_token: String,
}
