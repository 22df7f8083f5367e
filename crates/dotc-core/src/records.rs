//! # Records
//!
//! The data the CAF engine consumes (violations, staff, equipment context)
//! and produces (corrective action forms). These are plain data carriers;
//! all decision logic lives in `dotc-caf`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, ResponsibilityCategory};
use crate::identity::{CafId, EquipmentId, InspectionId, OrganizationId, StaffId, ViolationId};
use crate::number::CafNumber;

/// Canonical violation-code lookup entry joined onto a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCodeLookup {
    /// Regulatory code as listed in the lookup table.
    pub code: String,
    /// Authoritative responsibility type (`DRIVER` / `VEHICLE` / `OTHER`),
    /// stored as free text upstream.
    pub responsibility: Option<String>,
}

/// Equipment context joined onto a violation, when the inspection cited a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentInfo {
    pub id: EquipmentId,
    pub unit_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
}

impl EquipmentInfo {
    /// One-line description, e.g. `Unit 104: 2019 Freightliner Cascadia (VIN: 1FUJ...)`.
    ///
    /// Missing parts are omitted; a unit with no details at all renders as
    /// `Unidentified unit`.
    pub fn summary(&self) -> String {
        let vehicle: Vec<String> = [
            self.year.map(|y| y.to_string()),
            self.make.clone(),
            self.model.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        let mut out = match self.unit_number.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(unit) if vehicle.is_empty() => format!("Unit {unit}"),
            Some(unit) => format!("Unit {unit}: {}", vehicle.join(" ")),
            None if vehicle.is_empty() => "Unidentified unit".to_string(),
            None => vehicle.join(" "),
        };
        if let Some(vin) = self.vin.as_deref().filter(|v| !v.trim().is_empty()) {
            out.push_str(&format!(" (VIN: {vin})"));
        }
        out
    }
}

/// A regulatory violation cited on a roadside inspection.
///
/// Immutable from the engine's point of view. Every violation belongs to
/// exactly one inspection and, through it, to exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: ViolationId,
    pub inspection_id: InspectionId,
    /// Regulatory code as cited, e.g. `392.2A(1)`.
    pub code: String,
    pub description: String,
    /// Severity label as cited (free text, often a weight such as `7`).
    pub severity: Option<String>,
    pub out_of_service: bool,
    pub out_of_service_date: Option<NaiveDate>,
    /// Explicit responsibility tag recorded on the violation (free text).
    pub type_tag: Option<String>,
    pub code_lookup: Option<ViolationCodeLookup>,
    pub equipment: Option<EquipmentInfo>,
}

/// A staff member who can be routed CAFs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    /// May approve corrective action forms.
    pub can_approve_cafs: bool,
    /// Staff status; inactive staff are never routed.
    pub active: bool,
}

impl StaffMember {
    /// Case-insensitive substring match of any keyword against position or department.
    pub fn matches_any_keyword<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        let haystacks: Vec<String> = [self.position.as_deref(), self.department.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect();
        keywords.iter().any(|kw| {
            let kw = kw.as_ref().trim().to_lowercase();
            !kw.is_empty() && haystacks.iter().any(|h| h.contains(&kw))
        })
    }
}

/// A corrective action form: the unit of output of the engine.
///
/// Linked directly to one "primary" violation; its narrative covers every
/// violation in `covered_violations` (the primary included, listed first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveActionForm {
    pub id: CafId,
    pub number: CafNumber,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: ResponsibilityCategory,
    pub assigned_to: StaffId,
    pub created_by: StaffId,
    pub organization_id: OrganizationId,
    pub inspection_id: InspectionId,
    pub violation_id: ViolationId,
    pub covered_violations: Vec<ViolationId>,
    pub due_date: DateTime<Utc>,
    pub requires_approval: bool,
    pub created_at: DateTime<Utc>,
}
