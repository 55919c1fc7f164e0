use std::net::SocketAddr;

use shopyverse::{app::{self, AppServices}, config::Settings, database};

#[tokio::main]
async fn main() {
    // Setup tracing_subscriber
    tracing_subscriber::fmt().with_target(false).compact().init();

    // Setup state
    let settings = Settings::from_env().expect("Could not load settings");
    let db = database::connect(&settings.database_url).await.expect("Could not open database");
    database::create_tables(&db).await.expect("Could not create tables");

    let services = AppServices::build(&settings, db).expect("Could not build HTTP client");
    let app = app::router(&services);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Listening on {addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service()).await.expect("Server error");
}
