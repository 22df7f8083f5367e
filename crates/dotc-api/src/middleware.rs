//! # Request Metrics Middleware
//!
//! Counts requests by method and status class into the `metrics` recorder.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Increment `dotc_http_requests_total{method, status}` per request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let response = next.run(request).await;

    let status = match response.status().as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    metrics::counter!("dotc_http_requests_total", "method" => method, "status" => status)
        .increment(1);

    response
}
