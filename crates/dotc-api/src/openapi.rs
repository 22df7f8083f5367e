//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DOT Compliance API: Corrective Action Forms",
        version = "0.1.0",
        description = "Generates corrective action forms from roadside inspection violations, routes them to responsible staff, and exposes classification and routing configuration.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::cafs::generate_inspection_cafs,
        crate::routes::cafs::generate_violation_caf,
        crate::routes::cafs::list_cafs,
        crate::routes::cafs::get_caf,
        crate::routes::routing::get_routing_table,
        crate::routes::classify::classify_violation,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::cafs::CafResponse,
        crate::routes::cafs::GenerateCafsResponse,
        crate::routes::cafs::GenerateFromViolationRequest,
        crate::routes::cafs::ListCafsResponse,
        crate::routes::routing::RoutingTableResponse,
        crate::routes::classify::ClassifyRequest,
        crate::routes::classify::ClassifyResponse,
    )),
    tags(
        (name = "cafs", description = "Corrective action form generation and lookup"),
        (name = "routing", description = "Staff routing configuration"),
        (name = "classify", description = "Violation classification preview"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
