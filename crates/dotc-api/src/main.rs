//! # dotc-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use std::sync::Arc;

use dotc_api::db::PgStore;
use dotc_api::state::{AppConfig, AppState};
use dotc_caf::{CafRepository, InMemoryStore, RoutingTable};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotc_api::telemetry::init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting dotc-api");

    let metrics = dotc_api::telemetry::install_metrics_recorder().map_err(|e| {
        tracing::error!("Metrics recorder installation failed: {e}");
        e
    })?;

    let routing = match &config.routing_table {
        Some(path) => RoutingTable::load(path).map_err(|e| {
            tracing::error!("Routing table could not be loaded: {e}");
            e
        })?,
        None => {
            tracing::info!("ROUTING_TABLE not set, using built-in routing keywords");
            RoutingTable::builtin()
        }
    };

    let db_pool = dotc_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let store: Arc<dyn CafRepository> = match &db_pool {
        Some(pool) => Arc::new(PgStore::new(pool.clone())),
        None => Arc::new(InMemoryStore::new()),
    };

    let port = config.port;
    let state = AppState::with_store(config, store, routing, db_pool, metrics);
    let app = dotc_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("dotc-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
