//! # Routing Table API
//!
//! Exposes the effective category → keyword table used to route CAFs.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use dotc_caf::routing::KeywordMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Effective routing table. Keys are category names (`driver`,
/// `equipment`, `company`); organization keys are organization ids.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoutingTableResponse {
    pub default: BTreeMap<String, Vec<String>>,
    /// Per-organization overrides. Categories not listed use the default.
    pub organizations: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

fn by_name(map: &KeywordMap) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(category, keywords)| (category.as_str().to_string(), keywords.clone()))
        .collect()
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/routing-table", get(get_routing_table))
}

/// GET /v1/routing-table — Effective routing keywords.
///
/// Callers bound to an organization only see their own overrides.
#[utoipa::path(
    get,
    path = "/v1/routing-table",
    responses(
        (status = 200, description = "Routing table", body = RoutingTableResponse),
    ),
    tag = "routing"
)]
pub async fn get_routing_table(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<RoutingTableResponse>, AppError> {
    let table = state.engine.routing_table();
    let organizations = table
        .overrides()
        .iter()
        .filter(|(org, _)| caller.can_access_organization(**org))
        .map(|(org, map)| (org.as_uuid().to_string(), by_name(map)))
        .collect();
    Ok(Json(RoutingTableResponse {
        default: by_name(table.defaults()),
        organizations,
    }))
}
