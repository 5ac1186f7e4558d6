use axum_helpers::server::create_production_app;
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    observability::init_metrics();

    info!(
        app = config.app.name,
        version = config.app.version,
        "Connecting to PostgreSQL"
    );
    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let server = config.server.clone();
    let state = AppState {
        config,
        db: db.clone(),
        http,
    };
    let app = api::app(state)?;

    let shutdown_timeout = Duration::from_secs(server.shutdown_timeout_secs);
    info!(
        "Starting pricing API with graceful shutdown ({}s timeout)",
        shutdown_timeout.as_secs()
    );

    create_production_app(app, &server, shutdown_timeout, async move {
        info!("Shutting down: closing database connections");
        match db.close().await {
            Ok(_) => info!("PostgreSQL connection closed successfully"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Pricing API shutdown complete");
    Ok(())
}
