//! # Corrective Action Form API
//!
//! CAF generation for an inspection or a single violation, listing per
//! organization and lookup by id.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dotc_caf::store::{CafStore, ViolationStore};
use dotc_core::{CafId, CorrectiveActionForm, InspectionId, OrganizationId, StaffId, ViolationId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_optional_json, extract_validated_query, Validate};
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A corrective action form.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CafResponse {
    pub id: Uuid,
    /// Human-readable number, `CAF-<year>-<seq>`.
    #[schema(example = "CAF-2026-0042")]
    pub caf_number: String,
    pub title: String,
    pub description: String,
    #[schema(example = "critical")]
    pub priority: String,
    #[schema(example = "equipment")]
    pub category: String,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub organization_id: Uuid,
    pub inspection_id: Uuid,
    /// The first violation of the group.
    pub violation_id: Uuid,
    /// Every violation the CAF covers, in citation order.
    pub covered_violations: Vec<Uuid>,
    pub due_date: DateTime<Utc>,
    pub requires_approval: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CorrectiveActionForm> for CafResponse {
    fn from(caf: CorrectiveActionForm) -> Self {
        Self {
            id: *caf.id.as_uuid(),
            caf_number: caf.number.to_string(),
            title: caf.title,
            description: caf.description,
            priority: caf.priority.as_str().to_string(),
            category: caf.category.as_str().to_string(),
            assigned_to: *caf.assigned_to.as_uuid(),
            created_by: *caf.created_by.as_uuid(),
            organization_id: *caf.organization_id.as_uuid(),
            inspection_id: *caf.inspection_id.as_uuid(),
            violation_id: *caf.violation_id.as_uuid(),
            covered_violations: caf
                .covered_violations
                .iter()
                .map(|v| *v.as_uuid())
                .collect(),
            due_date: caf.due_date,
            requires_approval: caf.requires_approval,
            created_at: caf.created_at,
        }
    }
}

/// CAFs created by one generation run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateCafsResponse {
    pub cafs: Vec<CafResponse>,
    pub count: usize,
}

/// Optional body for single-violation generation.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateFromViolationRequest {
    /// Staff member to assign, bypassing routing.
    pub assigned_to: Option<Uuid>,
}

impl Validate for GenerateFromViolationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.assigned_to == Some(Uuid::nil()) {
            return Err("assigned_to must not be the nil uuid".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCafsQuery {
    /// Organization to list. Defaults to the caller's organization.
    pub organization_id: Option<Uuid>,
    /// Page size, 1 to 500 (default 50).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Validate for ListCafsQuery {
    fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_PAGE_SIZE {
                return Err(format!("limit must be between 1 and {MAX_PAGE_SIZE}"));
            }
        }
        Ok(())
    }
}

/// A page of CAFs, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListCafsResponse {
    pub cafs: Vec<CafResponse>,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/inspections/{inspection_id}/cafs",
            post(generate_inspection_cafs),
        )
        .route(
            "/v1/violations/{violation_id}/caf",
            post(generate_violation_caf),
        )
        .route("/v1/cafs", get(list_cafs))
        .route("/v1/cafs/{caf_id}", get(get_caf))
}

/// 403 if the inspection belongs to an organization the caller is not bound to.
async fn authorize_inspection(
    state: &AppState,
    caller: &CallerIdentity,
    inspection_id: InspectionId,
) -> Result<(), AppError> {
    if caller.organization_id.is_none() {
        return Ok(());
    }
    match state
        .engine
        .store()
        .inspection_organization(inspection_id)
        .await?
    {
        Some(org) => caller.require_organization(org),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/inspections/{inspection_id}/cafs — Generate CAFs for an inspection.
#[utoipa::path(
    post,
    path = "/v1/inspections/{inspection_id}/cafs",
    params(("inspection_id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 201, description = "Generation finished; zero to three CAFs created", body = GenerateCafsResponse),
        (status = 401, description = "No acting staff id", body = crate::error::ErrorBody),
        (status = 403, description = "Inspection belongs to another organization", body = crate::error::ErrorBody),
        (status = 422, description = "Organization could not be resolved", body = crate::error::ErrorBody),
    ),
    tag = "cafs"
)]
pub async fn generate_inspection_cafs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(inspection_id): Path<Uuid>,
) -> Result<(StatusCode, Json<GenerateCafsResponse>), AppError> {
    let requested_by = caller.acting_staff()?;
    let inspection_id = InspectionId::from_uuid(inspection_id);
    authorize_inspection(&state, &caller, inspection_id).await?;

    let cafs = state
        .engine
        .generate_cafs(inspection_id, requested_by)
        .await?;
    let cafs: Vec<CafResponse> = cafs.into_iter().map(CafResponse::from).collect();
    let count = cafs.len();
    Ok((StatusCode::CREATED, Json(GenerateCafsResponse { cafs, count })))
}

/// POST /v1/violations/{violation_id}/caf — Generate a CAF for one violation.
#[utoipa::path(
    post,
    path = "/v1/violations/{violation_id}/caf",
    params(("violation_id" = Uuid, Path, description = "Violation ID")),
    request_body(content = GenerateFromViolationRequest, description = "Optional assignee override"),
    responses(
        (status = 201, description = "CAF created", body = CafResponse),
        (status = 401, description = "No acting staff id", body = crate::error::ErrorBody),
        (status = 404, description = "Violation not found", body = crate::error::ErrorBody),
        (status = 409, description = "Violation already has a CAF", body = crate::error::ErrorBody),
        (status = 422, description = "No eligible assignee or invalid override", body = crate::error::ErrorBody),
    ),
    tag = "cafs"
)]
pub async fn generate_violation_caf(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(violation_id): Path<Uuid>,
    body: Result<Json<GenerateFromViolationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CafResponse>), AppError> {
    let requested_by = caller.acting_staff()?;
    let req = extract_optional_json(body)?.unwrap_or_default();
    let violation_id = ViolationId::from_uuid(violation_id);

    if caller.organization_id.is_some() {
        if let Some(violation) = state.engine.store().violation(violation_id).await? {
            authorize_inspection(&state, &caller, violation.inspection_id).await?;
        }
    }

    let caf = state
        .engine
        .generate_caf_from_violation(
            violation_id,
            requested_by,
            req.assigned_to.map(StaffId::from_uuid),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(caf.into())))
}

/// GET /v1/cafs — List an organization's CAFs, newest first.
#[utoipa::path(
    get,
    path = "/v1/cafs",
    params(ListCafsQuery),
    responses(
        (status = 200, description = "A page of CAFs", body = ListCafsResponse),
        (status = 403, description = "Organization not accessible", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid paging or missing organization", body = crate::error::ErrorBody),
    ),
    tag = "cafs"
)]
pub async fn list_cafs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListCafsQuery>, QueryRejection>,
) -> Result<Json<ListCafsResponse>, AppError> {
    let query = extract_validated_query(query)?;
    let organization_id = query
        .organization_id
        .map(OrganizationId::from_uuid)
        .or(caller.organization_id)
        .ok_or_else(|| AppError::Validation("organization_id is required".to_string()))?;
    caller.require_organization(organization_id)?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);
    let cafs: Vec<CafResponse> = state
        .engine
        .store()
        .cafs_for_organization(organization_id, limit, offset)
        .await?
        .into_iter()
        .map(CafResponse::from)
        .collect();
    let count = cafs.len();
    Ok(Json(ListCafsResponse {
        cafs,
        count,
        limit,
        offset,
    }))
}

/// GET /v1/cafs/{caf_id} — Fetch one CAF.
#[utoipa::path(
    get,
    path = "/v1/cafs/{caf_id}",
    params(("caf_id" = Uuid, Path, description = "CAF ID")),
    responses(
        (status = 200, description = "CAF found", body = CafResponse),
        (status = 403, description = "CAF belongs to another organization", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cafs"
)]
pub async fn get_caf(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(caf_id): Path<Uuid>,
) -> Result<Json<CafResponse>, AppError> {
    let caf = state
        .engine
        .store()
        .caf(CafId::from_uuid(caf_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("corrective action form {caf_id} not found")))?;
    caller.require_organization(caf.organization_id)?;
    Ok(Json(caf.into()))
}
