//! # Tracing & Metrics Setup
//!
//! `DOTC_LOG_FORMAT=json` switches log output to JSON lines. The level comes
//! from `RUST_LOG` (default `info`).

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("DOTC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Install the process-wide Prometheus recorder for `metrics` macros.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Whether `/metrics` and request counting are enabled. Defaults to `true`
/// unless `DOTC_METRICS_ENABLED` is `"false"`.
pub fn metrics_enabled() -> bool {
    std::env::var("DOTC_METRICS_ENABLED")
        .map(|v| !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}
