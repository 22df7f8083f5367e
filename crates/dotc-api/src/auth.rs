//! # Authentication Middleware
//!
//! Bearer token middleware that establishes the caller's identity context.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {staff_id}:{organization_id}:{secret}   staff token
//! Bearer {secret}                                 service token (legacy)
//! ```
//!
//! Either id of a staff token may be empty. A service token carries no
//! identity of its own; the acting staff member is then taken from the
//! `x-staff-id` header, as it is when authentication is disabled.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dotc_core::{OrganizationId, StaffId};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Header naming the acting staff member for service tokens and
/// unauthenticated development mode.
pub const STAFF_ID_HEADER: &str = "x-staff-id";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the caller, available to handlers via `FromRequestParts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallerIdentity {
    /// The acting staff member, recorded as the CAF creator.
    pub staff_id: Option<StaffId>,
    /// Organization the caller is bound to. `None` means unrestricted.
    pub organization_id: Option<OrganizationId>,
}

impl CallerIdentity {
    /// The acting staff member, or 401 if the request carries none.
    pub fn acting_staff(&self) -> Result<StaffId, AppError> {
        self.staff_id.ok_or_else(|| {
            AppError::Unauthorized(format!(
                "an acting staff id is required (staff token or {STAFF_ID_HEADER} header)"
            ))
        })
    }

    /// Whether the caller may see data of `organization_id`.
    pub fn can_access_organization(&self, organization_id: OrganizationId) -> bool {
        match self.organization_id {
            Some(own) => own == organization_id,
            None => true,
        }
    }

    /// 403 unless the caller may see data of `organization_id`.
    pub fn require_organization(&self, organization_id: OrganizationId) -> Result<(), AppError> {
        if self.can_access_organization(organization_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "caller is not bound to {organization_id}"
            )))
        }
    }
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn parse_optional_id(raw: &str, field: &str) -> Result<Option<Uuid>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<Uuid>()
        .map(Some)
        .map_err(|e| format!("invalid {field}: {e}"))
}

/// Parse a bearer token in format `{staff_id}:{organization_id}:{secret}` or
/// `{secret}` (service token).
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::default())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [staff, organization, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            Ok(CallerIdentity {
                staff_id: parse_optional_id(staff, "staff_id")?.map(StaffId::from_uuid),
                organization_id: parse_optional_id(organization, "organization_id")?
                    .map(OrganizationId::from_uuid),
            })
        }
        _ => Err(
            "invalid token format, expected {staff_id}:{organization_id}:{secret} or {secret}"
                .into(),
        ),
    }
}

/// Read the `x-staff-id` header, if present.
fn staff_id_header(headers: &HeaderMap) -> Result<Option<StaffId>, String> {
    match headers.get(STAFF_ID_HEADER) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| format!("{STAFF_ID_HEADER} header is not valid text"))?;
            parse_optional_id(raw.trim(), STAFF_ID_HEADER)
                .map(|id| id.map(StaffId::from_uuid))
        }
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token and inject [`CallerIdentity`] into request
/// extensions.
///
/// When `AuthConfig.token` is `None`, every request is allowed, unbound to
/// any organization, acting as the staff member named by `x-staff-id`.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let mut identity = match expected_token {
        Some(expected) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(value) if value.starts_with("Bearer ") => {
                    match parse_bearer_token(&value[7..], &expected) {
                        Ok(identity) => identity,
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            return unauthorized_response(&msg);
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    return unauthorized_response("authorization header must use Bearer scheme");
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    return unauthorized_response("missing authorization header");
                }
            }
        }
        None => CallerIdentity::default(),
    };

    if identity.staff_id.is_none() {
        match staff_id_header(request.headers()) {
            Ok(staff_id) => identity.staff_id = staff_id,
            Err(msg) => {
                tracing::warn!(reason = %msg, "authentication failed: bad staff id header");
                return unauthorized_response(&msg);
            }
        }
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
