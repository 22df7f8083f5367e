//! # Classification Preview API
//!
//! Runs the classifier and priority calculator on a violation payload
//! without touching the store.

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use dotc_caf::classifier::classify_parts;
use dotc_caf::priority;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

const MAX_FIELD_LEN: usize = 128;

/// Violation attributes relevant to classification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassifyRequest {
    /// Regulatory code, e.g. `392.2A(1)`.
    pub code: String,
    /// Explicit violation type tag, e.g. `DRIVER_PERFORMANCE`.
    pub type_tag: Option<String>,
    /// Canonical lookup responsibility: `DRIVER`, `VEHICLE` or `OTHER`.
    pub lookup_responsibility: Option<String>,
    #[serde(default)]
    pub out_of_service: bool,
}

impl Validate for ClassifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code must not be empty".to_string());
        }
        let fields = [
            ("code", Some(&self.code)),
            ("type_tag", self.type_tag.as_ref()),
            ("lookup_responsibility", self.lookup_responsibility.as_ref()),
        ];
        for (name, value) in fields {
            if value.is_some_and(|v| v.len() > MAX_FIELD_LEN) {
                return Err(format!("{name} must not exceed {MAX_FIELD_LEN} characters"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClassifyResponse {
    #[schema(example = "driver")]
    pub category: String,
    #[schema(example = "Driver")]
    pub category_label: String,
    #[schema(example = "high")]
    pub priority: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/classify", post(classify_violation))
}

/// POST /v1/classify — Classify a violation and compute its priority.
#[utoipa::path(
    post,
    path = "/v1/classify",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Classification", body = ClassifyResponse),
        (status = 422, description = "Invalid payload", body = crate::error::ErrorBody),
    ),
    tag = "classify"
)]
pub async fn classify_violation(
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let category = classify_parts(
        req.lookup_responsibility.as_deref(),
        req.type_tag.as_deref(),
        &req.code,
    );
    let priority = priority(req.out_of_service, req.code.trim());
    Ok(Json(ClassifyResponse {
        category: category.as_str().to_string(),
        category_label: category.label().to_string(),
        priority: priority.as_str().to_string(),
    }))
}
