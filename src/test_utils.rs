use std::sync::Arc;

use axum::{Router, body::Body, http::{Method, Request, header}, response::Response};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    app::{self, AppServices},
    config::{BlacklistBackend, Settings},
    database,
    services::{
        auth_service::{CoreAuthService, data_layer::DbAuthDataLayer},
        blacklist_service::{CoreBlacklistService, data_layer::MemoryBlacklistDataLayer},
        token_service::{CoreTokenService, settings::TokenSettings},
    },
};

pub fn token_settings() -> TokenSettings {
    TokenSettings {
        jwt_secret: "test-secret".to_string(),
        jwt_lifetime_s: 900,
        refr_token_lifetime_s: 3600,
    }
}

pub async fn memory_pool() -> SqlitePool {
    let db = database::connect("sqlite::memory:").await.unwrap();
    database::create_tables(&db).await.unwrap();
    db
}

pub fn auth_service(db: SqlitePool) -> CoreAuthService {
    CoreAuthService::new(
        Arc::new(DbAuthDataLayer::new(db)),
        Arc::new(CoreTokenService::new(token_settings())),
        Arc::new(CoreBlacklistService::new(Arc::new(MemoryBlacklistDataLayer::default()))),
    )
}

pub fn settings(nlu_base_url: String, openai_base_url: String) -> Settings {
    Settings {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        nlu_base_url,
        openai_api_key: "sk-test".to_string(),
        openai_base_url,
        blacklist_backend: BlacklistBackend::Memory,
        heartbeat_interval_s: 100,
        relay_queue_capacity: 64,
        upstream_timeout_s: 5,
        tokens: token_settings(),
    }
}

///
/// The full application over an in-memory database, with upstream calls
/// pointed at the given base URLs
///
pub async fn test_app(nlu_base_url: String, openai_base_url: String) -> (Router, AppServices) {
    let services = AppServices::build(&settings(nlu_base_url, openai_base_url), memory_pool().await).unwrap();
    (app::router(&services), services)
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_bytes(res: Response) -> Vec<u8> {
    hyper::body::to_bytes(res.into_body()).await.unwrap().to_vec()
}

pub async fn body_json(res: Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}
