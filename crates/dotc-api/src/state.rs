//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;

use dotc_caf::{CafEngine, CafRepository, EngineConfig, InMemoryStore, RoutingTable};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;

/// Server configuration read from the environment.
#[derive(Clone, Default)]
pub struct AppConfig {
    pub port: u16,
    pub auth_token: Option<String>,
    /// Path of a YAML routing table. `None` uses the built-in keywords.
    pub routing_table: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("routing_table", &self.routing_table)
            .finish()
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN` and `ROUTING_TABLE`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        let routing_table = std::env::var_os("ROUTING_TABLE").map(PathBuf::from);
        Self {
            port,
            auth_token,
            routing_table,
        }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<CafEngine>,
    pub db_pool: Option<PgPool>,
    pub metrics: PrometheusHandle,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("db_pool", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory state with the built-in routing table and auth disabled.
    pub fn new() -> Self {
        Self::in_memory(
            AppConfig::default(),
            InMemoryStore::new(),
            RoutingTable::builtin(),
        )
    }

    /// State backed by the given in-memory store.
    pub fn in_memory(config: AppConfig, store: InMemoryStore, routing: RoutingTable) -> Self {
        Self::with_store(config, Arc::new(store), routing, None, detached_metrics())
    }

    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn CafRepository>,
        routing: RoutingTable,
        db_pool: Option<PgPool>,
        metrics: PrometheusHandle,
    ) -> Self {
        let engine = CafEngine::with_config(store, Arc::new(routing), EngineConfig::default());
        Self {
            config,
            engine: Arc::new(engine),
            db_pool,
            metrics,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// A Prometheus handle not registered as the global recorder.
fn detached_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
