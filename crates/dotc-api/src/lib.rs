//! # dotc-api — HTTP Service for Corrective Action Forms
//!
//! Exposes the CAF engine over HTTP, backed by Postgres when `DATABASE_URL`
//! is set and by the in-memory store otherwise.
//!
//! ## API Surface
//!
//! | Route                                      | Module                  |
//! |--------------------------------------------|-------------------------|
//! | `POST /v1/inspections/{id}/cafs`           | [`routes::cafs`]        |
//! | `POST /v1/violations/{id}/caf`             | [`routes::cafs`]        |
//! | `GET /v1/cafs`, `GET /v1/cafs/{id}`        | [`routes::cafs`]        |
//! | `GET /v1/routing-table`                    | [`routes::routing`]     |
//! | `POST /v1/classify`                        | [`routes::classify`]    |
//! | `GET /openapi.json`                        | [`openapi`]             |
//! | `GET /health/*`, `GET /metrics`            | unauthenticated         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics_on = telemetry::metrics_enabled();

    let mut api = Router::new()
        .merge(routes::cafs::router())
        .merge(routes::routing::router())
        .merge(routes::classify::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api.layer(from_fn(middleware::metrics_middleware));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated =
            unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.render(),
    )
}

/// Liveness probe: always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: checks the database when one is configured.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
