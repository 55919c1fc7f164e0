pub mod app;
pub mod config;
pub mod data_layer_error;
pub mod database;

pub mod middleware {
    pub mod auth_middleware;
}

pub mod models {
    pub mod ai_models;
    pub mod auth_models;
    pub mod catalog_models;
    pub mod chat_models;
    pub mod relay_models;
}

pub mod routes {
    pub mod ai_routes;
    pub mod auth_routes;
    pub mod catalog_routes;
    pub mod chat_routes;
    pub mod relay_routes;
    pub mod user_routes;
}

pub mod services {
    pub mod auth_service;
    pub mod blacklist_service;
    pub mod catalog_service;
    pub mod chat_service;
    pub mod nlu_service;
    pub mod openai_service;
    pub mod relay_service;
    pub mod token_service;
    pub mod upstream_error;
}

#[cfg(test)]
mod test_utils;
