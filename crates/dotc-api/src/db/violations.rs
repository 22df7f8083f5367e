//! Violation and inspection queries.
//!
//! Violations are loaded with their canonical code lookup and equipment
//! context joined in, in citation order (`created_at, id`).

use chrono::NaiveDate;
use dotc_core::{
    EquipmentId, EquipmentInfo, InspectionId, OrganizationId, Violation, ViolationCodeLookup,
    ViolationId,
};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_VIOLATION: &str = "
    SELECT v.id, v.inspection_id, v.code, v.description, v.severity,
           v.out_of_service, v.out_of_service_date, v.type_tag,
           vc.code AS lookup_code, vc.responsibility AS lookup_responsibility,
           e.id AS equipment_id, e.unit_number, e.make, e.model,
           e.year AS equipment_year, e.vin
    FROM violations v
    LEFT JOIN violation_codes vc ON vc.code = v.code
    LEFT JOIN equipment e ON e.id = v.equipment_id";

/// Violations on the inspection with no CAF link, in citation order.
pub async fn unlinked_for_inspection(
    pool: &PgPool,
    inspection_id: InspectionId,
) -> Result<Vec<Violation>, sqlx::Error> {
    let sql = format!(
        "{SELECT_VIOLATION}
         WHERE v.inspection_id = $1
           AND NOT EXISTS (SELECT 1 FROM caf_violation_links l WHERE l.violation_id = v.id)
         ORDER BY v.created_at, v.id"
    );
    let rows = sqlx::query_as::<_, ViolationRow>(&sql)
        .bind(*inspection_id.as_uuid())
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(ViolationRow::into_record).collect())
}

pub async fn get_by_id(pool: &PgPool, id: ViolationId) -> Result<Option<Violation>, sqlx::Error> {
    let sql = format!("{SELECT_VIOLATION} WHERE v.id = $1");
    let row = sqlx::query_as::<_, ViolationRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(ViolationRow::into_record))
}

/// The organization that owns the inspection.
pub async fn inspection_organization(
    pool: &PgPool,
    inspection_id: InspectionId,
) -> Result<Option<OrganizationId>, sqlx::Error> {
    let org: Option<Uuid> =
        sqlx::query_scalar("SELECT organization_id FROM inspections WHERE id = $1")
            .bind(*inspection_id.as_uuid())
            .fetch_optional(pool)
            .await?;
    Ok(org.map(OrganizationId::from_uuid))
}

#[derive(sqlx::FromRow)]
struct ViolationRow {
    id: Uuid,
    inspection_id: Uuid,
    code: String,
    description: String,
    severity: Option<String>,
    out_of_service: bool,
    out_of_service_date: Option<NaiveDate>,
    type_tag: Option<String>,
    lookup_code: Option<String>,
    lookup_responsibility: Option<String>,
    equipment_id: Option<Uuid>,
    unit_number: Option<String>,
    make: Option<String>,
    model: Option<String>,
    equipment_year: Option<i32>,
    vin: Option<String>,
}

impl ViolationRow {
    fn into_record(self) -> Violation {
        let code_lookup = self.lookup_code.map(|code| ViolationCodeLookup {
            code,
            responsibility: self.lookup_responsibility,
        });
        let equipment = self.equipment_id.map(|id| EquipmentInfo {
            id: EquipmentId::from_uuid(id),
            unit_number: self.unit_number,
            make: self.make,
            model: self.model,
            year: self.equipment_year,
            vin: self.vin,
        });
        Violation {
            id: ViolationId::from_uuid(self.id),
            inspection_id: InspectionId::from_uuid(self.inspection_id),
            code: self.code,
            description: self.description,
            severity: self.severity,
            out_of_service: self.out_of_service,
            out_of_service_date: self.out_of_service_date,
            type_tag: self.type_tag,
            code_lookup,
            equipment,
        }
    }
}
