//! # Database Persistence Layer
//!
//! Postgres implementation of the engine's store contracts via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the API
//! reads inspections, violations and staff from Postgres and persists CAFs
//! there. When absent, the API runs against an in-memory store (development
//! and testing).
//!
//! Query functions live in per-table modules and take a `&PgPool`.
//! [`PgStore`] adapts them to the engine traits and translates SQLx errors
//! into [`StoreError`].

pub mod cafs;
pub mod staff;
pub mod violations;

use async_trait::async_trait;
use dotc_caf::store::{CafStore, StaffQuery, StaffStore, StoreError, ViolationStore};
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, StaffId, StaffMember,
    Violation, ViolationId,
};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running against the in-memory store. \
                 CAFs will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ViolationStore for PgStore {
    async fn unlinked_violations(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Vec<Violation>, StoreError> {
        violations::unlinked_for_inspection(&self.pool, inspection_id)
            .await
            .map_err(backend)
    }

    async fn violation(&self, id: ViolationId) -> Result<Option<Violation>, StoreError> {
        violations::get_by_id(&self.pool, id).await.map_err(backend)
    }

    async fn inspection_organization(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Option<OrganizationId>, StoreError> {
        violations::inspection_organization(&self.pool, inspection_id)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl StaffStore for PgStore {
    async fn find_staff(
        &self,
        organization_id: OrganizationId,
        query: &StaffQuery,
    ) -> Result<Option<StaffMember>, StoreError> {
        staff::find(&self.pool, organization_id, query)
            .await
            .map_err(backend)
    }

    async fn active_member(
        &self,
        organization_id: OrganizationId,
        staff_id: StaffId,
    ) -> Result<Option<StaffMember>, StoreError> {
        staff::active_member(&self.pool, organization_id, staff_id)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl CafStore for PgStore {
    async fn latest_number(&self, year: i32) -> Result<Option<CafNumber>, StoreError> {
        let text = cafs::latest_number_text(&self.pool, year)
            .await
            .map_err(backend)?;
        match text {
            None => Ok(None),
            Some(raw) => raw.parse::<CafNumber>().map(Some).map_err(|e| {
                tracing::warn!(caf_number = %raw, error = %e, "unparseable CAF number in store");
                StoreError::Corrupt(format!("caf_number {raw:?}: {e}"))
            }),
        }
    }

    async fn insert_caf(&self, caf: &CorrectiveActionForm) -> Result<(), StoreError> {
        cafs::insert(&self.pool, caf).await.map_err(|e| match e {
            cafs::InsertError::DuplicateNumber => StoreError::DuplicateNumber(caf.number),
            cafs::InsertError::AlreadyLinked(v) => StoreError::AlreadyLinked(v),
            cafs::InsertError::Database(err) => backend(err),
        })
    }

    async fn violation_has_caf(&self, violation_id: ViolationId) -> Result<bool, StoreError> {
        cafs::violation_is_linked(&self.pool, violation_id)
            .await
            .map_err(backend)
    }

    async fn caf(&self, id: CafId) -> Result<Option<CorrectiveActionForm>, StoreError> {
        match cafs::get_by_id(&self.pool, id).await.map_err(backend)? {
            None => Ok(None),
            Some(Ok(caf)) => Ok(Some(caf)),
            Some(Err(reason)) => {
                tracing::warn!(caf_id = %id, %reason, "unreadable corrective action form row");
                Err(StoreError::Corrupt(reason))
            }
        }
    }

    async fn cafs_for_organization(
        &self,
        organization_id: OrganizationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CorrectiveActionForm>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        cafs::list_for_organization(&self.pool, organization_id, limit, offset)
            .await
            .map_err(backend)
    }
}
