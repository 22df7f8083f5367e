//! Corrective action form persistence.
//!
//! A CAF row and its `caf_violation_links` rows are written in one
//! transaction. Uniqueness violations are reported as [`InsertError`]
//! variants so the engine can retry or skip.

use chrono::{DateTime, Utc};
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, Priority,
    ResponsibilityCategory, StaffId, ViolationId,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Unique constraint on `corrective_action_forms.caf_number`.
pub const CAF_NUMBER_CONSTRAINT: &str = "caf_number_unique";

/// Why an insert was rejected.
#[derive(Debug)]
pub enum InsertError {
    DuplicateNumber,
    AlreadyLinked(ViolationId),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for InsertError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.constraint() == Some(constraint),
        _ => false,
    }
}

/// Insert the CAF and link every violation it covers, atomically.
pub async fn insert(pool: &PgPool, caf: &CorrectiveActionForm) -> Result<(), InsertError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO corrective_action_forms
             (id, caf_number, title, description, priority, category, assigned_to, created_by,
              organization_id, inspection_id, violation_id, due_date, requires_approval, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(*caf.id.as_uuid())
    .bind(caf.number.to_string())
    .bind(&caf.title)
    .bind(&caf.description)
    .bind(caf.priority.as_str())
    .bind(caf.category.as_str())
    .bind(*caf.assigned_to.as_uuid())
    .bind(*caf.created_by.as_uuid())
    .bind(*caf.organization_id.as_uuid())
    .bind(*caf.inspection_id.as_uuid())
    .bind(*caf.violation_id.as_uuid())
    .bind(caf.due_date)
    .bind(caf.requires_approval)
    .bind(caf.created_at)
    .execute(&mut *tx)
    .await;
    if let Err(e) = inserted {
        if is_unique_violation(&e, CAF_NUMBER_CONSTRAINT) {
            return Err(InsertError::DuplicateNumber);
        }
        return Err(e.into());
    }

    for (position, violation_id) in caf.covered_violations.iter().enumerate() {
        link(&mut tx, caf.id, *violation_id, position).await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn link(
    tx: &mut Transaction<'_, Postgres>,
    caf_id: CafId,
    violation_id: ViolationId,
    position: usize,
) -> Result<(), InsertError> {
    let result = sqlx::query(
        "INSERT INTO caf_violation_links (violation_id, caf_id, position) VALUES ($1, $2, $3)",
    )
    .bind(*violation_id.as_uuid())
    .bind(*caf_id.as_uuid())
    .bind(i32::try_from(position).unwrap_or(i32::MAX))
    .execute(&mut **tx)
    .await;
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e, "caf_violation_links_pkey") => {
            Err(InsertError::AlreadyLinked(violation_id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Highest CAF number text for the year, longest first so that five-digit
/// sequences sort above four-digit ones.
pub async fn latest_number_text(pool: &PgPool, year: i32) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT caf_number FROM corrective_action_forms
         WHERE caf_number LIKE $1
         ORDER BY length(caf_number) DESC, caf_number DESC
         LIMIT 1",
    )
    .bind(format!("{}%", CafNumber::year_prefix(year)))
    .fetch_optional(pool)
    .await
}

pub async fn violation_is_linked(
    pool: &PgPool,
    violation_id: ViolationId,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM caf_violation_links WHERE violation_id = $1)",
    )
    .bind(*violation_id.as_uuid())
    .fetch_one(pool)
    .await
}

const SELECT_CAF: &str = "
    SELECT c.id, c.caf_number, c.title, c.description, c.priority, c.category,
           c.assigned_to, c.created_by, c.organization_id, c.inspection_id, c.violation_id,
           c.due_date, c.requires_approval, c.created_at,
           COALESCE(
               (SELECT array_agg(l.violation_id ORDER BY l.position)
                FROM caf_violation_links l WHERE l.caf_id = c.id),
               ARRAY[]::uuid[]
           ) AS covered_violations
    FROM corrective_action_forms c";

/// Fetch a CAF. `Ok(Some(Err(_)))` carries a row that failed to decode.
pub async fn get_by_id(
    pool: &PgPool,
    id: CafId,
) -> Result<Option<Result<CorrectiveActionForm, String>>, sqlx::Error> {
    let sql = format!("{SELECT_CAF} WHERE c.id = $1");
    let row = sqlx::query_as::<_, CafRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CafRow::into_record))
}

/// CAFs of an organization, newest first. Undecodable rows are skipped with
/// a warning.
pub async fn list_for_organization(
    pool: &PgPool,
    organization_id: OrganizationId,
    limit: i64,
    offset: i64,
) -> Result<Vec<CorrectiveActionForm>, sqlx::Error> {
    let sql = format!(
        "{SELECT_CAF} WHERE c.organization_id = $1
         ORDER BY c.created_at DESC, c.caf_number DESC LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, CafRow>(&sql)
        .bind(*organization_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row.into_record() {
            Ok(caf) => Some(caf),
            Err(reason) => {
                tracing::warn!(%reason, "skipping unreadable corrective action form row");
                None
            }
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct CafRow {
    id: Uuid,
    caf_number: String,
    title: String,
    description: String,
    priority: String,
    category: String,
    assigned_to: Uuid,
    created_by: Uuid,
    organization_id: Uuid,
    inspection_id: Uuid,
    violation_id: Uuid,
    due_date: DateTime<Utc>,
    requires_approval: bool,
    created_at: DateTime<Utc>,
    covered_violations: Vec<Uuid>,
}

impl CafRow {
    fn into_record(self) -> Result<CorrectiveActionForm, String> {
        let number: CafNumber = self
            .caf_number
            .parse()
            .map_err(|e| format!("caf {}: {e}", self.id))?;
        let priority: Priority = self
            .priority
            .parse()
            .map_err(|e| format!("caf {}: {e}", self.id))?;
        let category: ResponsibilityCategory = self
            .category
            .parse()
            .map_err(|e| format!("caf {}: {e}", self.id))?;
        Ok(CorrectiveActionForm {
            id: CafId::from_uuid(self.id),
            number,
            title: self.title,
            description: self.description,
            priority,
            category,
            assigned_to: StaffId::from_uuid(self.assigned_to),
            created_by: StaffId::from_uuid(self.created_by),
            organization_id: OrganizationId::from_uuid(self.organization_id),
            inspection_id: InspectionId::from_uuid(self.inspection_id),
            violation_id: ViolationId::from_uuid(self.violation_id),
            covered_violations: self
                .covered_violations
                .into_iter()
                .map(ViolationId::from_uuid)
                .collect(),
            due_date: self.due_date,
            requires_approval: self.requires_approval,
            created_at: self.created_at,
        })
    }
}
