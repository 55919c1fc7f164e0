use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::services::token_service::settings::TokenSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key} value `{value}`: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

///
/// Where revoked token identifiers are kept
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlacklistBackend {
    Memory,
    Database,
}

impl FromStr for BlacklistBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BlacklistBackend::Memory),
            "database" | "db" => Ok(BlacklistBackend::Database),
            other => Err(format!("unknown blacklist backend `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub port: u16,
    pub database_url: String,
    pub nlu_base_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub blacklist_backend: BlacklistBackend,
    pub heartbeat_interval_s: u64,
    pub relay_queue_capacity: usize,
    pub upstream_timeout_s: u64,
    pub tokens: TokenSettings,
}

impl Settings {
    ///
    /// Reads every setting from the process environment, after loading a
    /// `.env` file if one is present. Only `JWT_SECRET` has no default.
    ///
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            warn!("OPENAI_API_KEY not set, completion and image endpoints will be rejected upstream");
            String::new()
        });

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_url: try_load("DATABASE_URL", "sqlite://shopyverse.db?mode=rwc")?,
            nlu_base_url: try_load("NLU_BASE_URL", "http://localhost:5005")?,
            openai_api_key,
            openai_base_url: try_load("OPENAI_BASE_URL", "https://api.openai.com")?,
            blacklist_backend: try_load("BLACKLIST_BACKEND", "memory")?,
            heartbeat_interval_s: try_load("HEARTBEAT_INTERVAL_S", "100")?,
            relay_queue_capacity: try_load("RELAY_QUEUE_CAPACITY", "64")?,
            upstream_timeout_s: try_load("UPSTREAM_TIMEOUT_S", "30")?,
            tokens: TokenSettings {
                jwt_secret,
                jwt_lifetime_s: try_load("JWT_LIFETIME_S", "900")?,
                refr_token_lifetime_s: try_load("REFR_TOKEN_LIFETIME_S", "2592000")?,
            },
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
