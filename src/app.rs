use std::{sync::Arc, time::Duration};

use axum::Router;
use reqwest::Client;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::{self, TraceLayer}};
use tracing::Level;

use crate::{
    config::{BlacklistBackend, Settings},
    routes::{ai_routes, auth_routes, catalog_routes, chat_routes, relay_routes, user_routes},
    services::{
        auth_service::{AuthService, CoreAuthService, data_layer::DbAuthDataLayer},
        blacklist_service::{BlacklistService, CoreBlacklistService, data_layer::{BlacklistDataLayer, DbBlacklistDataLayer, MemoryBlacklistDataLayer}},
        catalog_service::{CatalogService, CoreCatalogService, data_layer::DbCatalogDataLayer},
        chat_service::{ChatService, CoreChatService, data_layer::DbChatDataLayer},
        nlu_service::{NluService, RasaNluService},
        openai_service::{CoreOpenAiService, OpenAiService},
        relay_service::RelayHub,
        token_service::CoreTokenService,
    },
};

///
/// Every process-wide service, built once at startup and handed to the
/// routers that need them
///
#[derive(Clone)]
pub struct AppServices {
    pub auth_service: Arc<dyn AuthService>,
    pub catalog_service: Arc<dyn CatalogService>,
    pub chat_service: Arc<dyn ChatService>,
    pub nlu_service: Arc<dyn NluService>,
    pub openai_service: Arc<dyn OpenAiService>,
    pub relay_hub: Arc<RelayHub>,
}

impl AppServices {
    pub fn build(settings: &Settings, db: SqlitePool) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream_timeout_s))
            .build()?;

        let blacklist_data_layer: Arc<dyn BlacklistDataLayer> = match settings.blacklist_backend {
            BlacklistBackend::Memory => Arc::new(MemoryBlacklistDataLayer::default()),
            BlacklistBackend::Database => Arc::new(DbBlacklistDataLayer::new(db.clone())),
        };
        let blacklist: Arc<dyn BlacklistService> = Arc::new(CoreBlacklistService::new(blacklist_data_layer));
        let token_service = Arc::new(CoreTokenService::new(settings.tokens.clone()));

        let auth_data_layer = Arc::new(DbAuthDataLayer::new(db.clone()));
        let auth_service = Arc::new(CoreAuthService::new(auth_data_layer, token_service, blacklist));

        let catalog_service = Arc::new(CoreCatalogService::new(Arc::new(DbCatalogDataLayer::new(db.clone()))));
        let chat_service = Arc::new(CoreChatService::new(Arc::new(DbChatDataLayer::new(db))));

        let nlu_service: Arc<dyn NluService> = Arc::new(RasaNluService::new(client.clone(), settings.nlu_base_url.clone()));
        let openai_service = Arc::new(CoreOpenAiService::new(
            client, settings.openai_api_key.clone(), settings.openai_base_url.clone(),
        ));
        let relay_hub = RelayHub::new(
            nlu_service.clone(), Duration::from_secs(settings.heartbeat_interval_s), settings.relay_queue_capacity,
        );

        Ok(Self { auth_service, catalog_service, chat_service, nlu_service, openai_service, relay_hub })
    }
}

pub fn router(services: &AppServices) -> Router {
    Router::new()
        // Routes
        .merge(auth_routes::routes(services.auth_service.clone()))
        .merge(user_routes::routes(services.auth_service.clone()))
        .merge(catalog_routes::routes(services.catalog_service.clone(), services.auth_service.clone()))
        .merge(chat_routes::routes(services.chat_service.clone()))
        .merge(ai_routes::routes(
            services.nlu_service.clone(), services.openai_service.clone(), services.chat_service.clone(),
        ))
        .merge(relay_routes::routes(services.relay_hub.clone()))
        // Logging
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO))
        )
        // Cross-origin clients
        .layer(CorsLayer::permissive())
}
