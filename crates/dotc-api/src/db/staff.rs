//! Staff routing queries.
//!
//! Every query is restricted to staff with an active role in the
//! organization and `status = 'active'`, ordered by `created_at, id` so the
//! same data always routes to the same person.

use dotc_caf::StaffQuery;
use dotc_core::{OrganizationId, StaffId, StaffMember};
use sqlx::PgPool;
use uuid::Uuid;

const ELIGIBLE_STAFF: &str = "
    SELECT s.id, s.name, s.position, s.department, s.can_approve_cafs
    FROM staff s
    WHERE s.status = 'active'
      AND EXISTS (
          SELECT 1 FROM staff_roles r
          WHERE r.staff_id = s.id AND r.organization_id = $1 AND r.active
      )";

/// First eligible staff member matching the query.
pub async fn find(
    pool: &PgPool,
    organization_id: OrganizationId,
    query: &StaffQuery,
) -> Result<Option<StaffMember>, sqlx::Error> {
    let org = *organization_id.as_uuid();
    let row = match query {
        StaffQuery::Keywords(keywords) => {
            let patterns: Vec<String> = keywords.iter().map(|k| like_pattern(k)).collect();
            let sql = format!(
                "{ELIGIBLE_STAFF}
                   AND (s.position ILIKE ANY($2) OR s.department ILIKE ANY($2))
                 ORDER BY s.created_at, s.id LIMIT 1"
            );
            sqlx::query_as::<_, StaffRow>(&sql)
                .bind(org)
                .bind(patterns)
                .fetch_optional(pool)
                .await?
        }
        StaffQuery::CanApprove => {
            let sql = format!(
                "{ELIGIBLE_STAFF} AND s.can_approve_cafs ORDER BY s.created_at, s.id LIMIT 1"
            );
            sqlx::query_as::<_, StaffRow>(&sql)
                .bind(org)
                .fetch_optional(pool)
                .await?
        }
        StaffQuery::AnyActive => {
            let sql = format!("{ELIGIBLE_STAFF} ORDER BY s.created_at, s.id LIMIT 1");
            sqlx::query_as::<_, StaffRow>(&sql)
                .bind(org)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(row.map(|r| r.into_record(organization_id)))
}

/// The staff member, if eligible for routing in the organization.
pub async fn active_member(
    pool: &PgPool,
    organization_id: OrganizationId,
    staff_id: StaffId,
) -> Result<Option<StaffMember>, sqlx::Error> {
    let sql = format!("{ELIGIBLE_STAFF} AND s.id = $2");
    let row = sqlx::query_as::<_, StaffRow>(&sql)
        .bind(*organization_id.as_uuid())
        .bind(*staff_id.as_uuid())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.into_record(organization_id)))
}

/// `%keyword%` with LIKE metacharacters escaped.
fn like_pattern(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len() + 2);
    out.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: Uuid,
    name: String,
    position: Option<String>,
    department: Option<String>,
    can_approve_cafs: bool,
}

impl StaffRow {
    fn into_record(self, organization_id: OrganizationId) -> StaffMember {
        StaffMember {
            id: StaffId::from_uuid(self.id),
            organization_id,
            name: self.name,
            position: self.position,
            department: self.department,
            can_approve_cafs: self.can_approve_cafs,
            active: true,
        }
    }
}
