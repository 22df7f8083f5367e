//! # CAF Assembler
//!
//! Orchestrates classification, priority, routing and narrative generation
//! and persists one corrective action form per non-empty responsibility
//! group.
//!
//! ## Failure Semantics
//!
//! - The organization of the inspection must resolve; otherwise the whole
//!   call fails with [`EngineError::OrganizationUnresolved`].
//! - A group with no eligible assignee, a group whose violations were linked
//!   by a concurrent run, and a group whose number allocation exhausts its
//!   retries are skipped with a warning. The remaining groups proceed.
//! - Store backend failures abort the call. Groups persisted before the
//!   failure stay persisted; every group is its own atomic insert.
//!
//! ## Numbering
//!
//! `CAF-<year>-<seq>` numbers are allocated by reading the highest number of
//! the year and inserting the successor. Allocation inside one engine is
//! serialized by an async mutex; across processes the store's uniqueness
//! constraint rejects collisions with [`StoreError::DuplicateNumber`], and
//! allocation retries with a fresh read up to
//! [`EngineConfig::max_number_attempts`] times.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, Priority,
    ResponsibilityCategory, StaffId, ValidationError, Violation, ViolationId,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::classifier::classify;
use crate::narrative::describe;
use crate::priority::group_priority;
use crate::routing::{RoutingTable, StaffRouter};
use crate::store::{CafRepository, StoreError};

/// Errors surfaced by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The inspection's organization could not be resolved.
    #[error("organization for {0} could not be resolved")]
    OrganizationUnresolved(InspectionId),

    #[error("{0} not found")]
    ViolationNotFound(ViolationId),

    /// The violation is already covered by a CAF.
    #[error("{0} already has a corrective action form")]
    AlreadyLinked(ViolationId),

    /// No active staff member in the organization can take the CAF.
    #[error("no eligible assignee for {category} CAF in {organization_id}")]
    NoAssignee {
        organization_id: OrganizationId,
        category: ResponsibilityCategory,
    },

    /// The requested assignee is not an active member of the organization.
    #[error("{staff_id} is not an active staff member of {organization_id}")]
    InvalidAssignee {
        organization_id: OrganizationId,
        staff_id: StaffId,
    },

    #[error("could not allocate a CAF number for {year} after {attempts} attempts")]
    NumberAllocationExhausted { year: i32, attempts: u32 },

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Engine policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Due window for non-critical CAFs, in days.
    pub standard_due_days: i64,
    /// Due window for Critical CAFs, in days.
    pub critical_due_days: i64,
    /// Number allocation attempts before a group is given up.
    pub max_number_attempts: u32,
    /// Approval flag stamped on every generated CAF.
    pub requires_approval: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            standard_due_days: 30,
            critical_due_days: 15,
            max_number_attempts: 3,
            requires_approval: true,
        }
    }
}

impl EngineConfig {
    /// Due date of a CAF with the given priority created at `now`.
    pub fn due_date(&self, priority: Priority, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = match priority {
            Priority::Critical => self.critical_due_days,
            Priority::High | Priority::Medium => self.standard_due_days,
        };
        now + Duration::days(days)
    }
}

/// Everything about a CAF except its number.
struct Draft {
    organization_id: OrganizationId,
    inspection_id: InspectionId,
    category: ResponsibilityCategory,
    priority: Priority,
    assigned_to: StaffId,
    created_by: StaffId,
    /// First violation of the group; the CAF links to it directly.
    primary: ViolationId,
    violations: Vec<ViolationId>,
    title: String,
    description: String,
}

/// The CAF generation engine.
pub struct CafEngine {
    store: Arc<dyn CafRepository>,
    routing: Arc<RoutingTable>,
    config: EngineConfig,
    numbering: Mutex<()>,
}

impl std::fmt::Debug for CafEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CafEngine")
            .field("routing", &self.routing)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CafEngine {
    pub fn new(store: Arc<dyn CafRepository>, routing: Arc<RoutingTable>) -> Self {
        Self::with_config(store, routing, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn CafRepository>,
        routing: Arc<RoutingTable>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            routing,
            config,
            numbering: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CafRepository> {
        &self.store
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate CAFs for every violation on the inspection that has none yet.
    pub async fn generate_cafs(
        &self,
        inspection_id: InspectionId,
        requested_by: StaffId,
    ) -> Result<Vec<CorrectiveActionForm>, EngineError> {
        self.generate_cafs_at(inspection_id, requested_by, Utc::now())
            .await
    }

    /// [`Self::generate_cafs`] with an explicit creation time.
    ///
    /// Returns between zero and three CAFs, in Driver, Equipment, Company
    /// order. An inspection with no unlinked violations yields an empty list.
    pub async fn generate_cafs_at(
        &self,
        inspection_id: InspectionId,
        requested_by: StaffId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CorrectiveActionForm>, EngineError> {
        let violations = self.store.unlinked_violations(inspection_id).await?;
        if violations.is_empty() {
            tracing::debug!(inspection_id = %inspection_id, "no unlinked violations");
            return Ok(Vec::new());
        }

        let organization_id = self
            .store
            .inspection_organization(inspection_id)
            .await?
            .ok_or(EngineError::OrganizationUnresolved(inspection_id))?;

        let groups = partition(violations);
        let router = StaffRouter::new(&self.routing);
        let mut created = Vec::with_capacity(groups.len());

        for (category, group) in groups {
            let Some(primary) = group.first().map(|v| v.id) else {
                continue;
            };
            let priority = group_priority(&group);
            let assignee = match router
                .route(self.store.as_ref(), organization_id, category)
                .await?
            {
                Some(routed) => routed.staff.id,
                None => {
                    skip_group(inspection_id, category, "no_assignee", group.len());
                    continue;
                }
            };

            let narrative = describe(category, &group);
            let draft = Draft {
                organization_id,
                inspection_id,
                category,
                priority,
                assigned_to: assignee,
                created_by: requested_by,
                primary,
                violations: group.iter().map(|v| v.id).collect(),
                title: narrative.title,
                description: narrative.description,
            };

            match self.persist(draft, now).await {
                Ok(caf) => created.push(caf),
                Err(EngineError::AlreadyLinked(_)) => {
                    skip_group(inspection_id, category, "already_linked", group.len());
                }
                Err(EngineError::NumberAllocationExhausted { .. }) => {
                    skip_group(inspection_id, category, "number_exhausted", group.len());
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            inspection_id = %inspection_id,
            organization_id = %organization_id,
            created = created.len(),
            "CAF generation finished"
        );
        Ok(created)
    }

    /// Generate a CAF for a single violation.
    ///
    /// With `assignee` set, routing is bypassed and the staff member must be
    /// active in the violation's organization.
    pub async fn generate_caf_from_violation(
        &self,
        violation_id: ViolationId,
        requested_by: StaffId,
        assignee: Option<StaffId>,
    ) -> Result<CorrectiveActionForm, EngineError> {
        self.generate_caf_from_violation_at(violation_id, requested_by, assignee, Utc::now())
            .await
    }

    pub async fn generate_caf_from_violation_at(
        &self,
        violation_id: ViolationId,
        requested_by: StaffId,
        assignee: Option<StaffId>,
        now: DateTime<Utc>,
    ) -> Result<CorrectiveActionForm, EngineError> {
        let violation = self
            .store
            .violation(violation_id)
            .await?
            .ok_or(EngineError::ViolationNotFound(violation_id))?;
        if self.store.violation_has_caf(violation_id).await? {
            return Err(EngineError::AlreadyLinked(violation_id));
        }

        let organization_id = self
            .store
            .inspection_organization(violation.inspection_id)
            .await?
            .ok_or(EngineError::OrganizationUnresolved(violation.inspection_id))?;

        let category = classify(&violation);
        let assigned_to = match assignee {
            Some(staff_id) => self
                .store
                .active_member(organization_id, staff_id)
                .await?
                .map(|m| m.id)
                .ok_or(EngineError::InvalidAssignee {
                    organization_id,
                    staff_id,
                })?,
            None => StaffRouter::new(&self.routing)
                .route(self.store.as_ref(), organization_id, category)
                .await?
                .map(|r| r.staff.id)
                .ok_or(EngineError::NoAssignee {
                    organization_id,
                    category,
                })?,
        };

        let inspection_id = violation.inspection_id;
        let group = [violation];
        let narrative = describe(category, &group);
        let draft = Draft {
            organization_id,
            inspection_id,
            category,
            priority: group_priority(&group),
            assigned_to,
            created_by: requested_by,
            primary: violation_id,
            violations: vec![violation_id],
            title: narrative.title,
            description: narrative.description,
        };
        self.persist(draft, now).await
    }

    /// Allocate a number and insert the CAF, retrying on number collisions.
    async fn persist(
        &self,
        draft: Draft,
        now: DateTime<Utc>,
    ) -> Result<CorrectiveActionForm, EngineError> {
        let year = now.year();
        let first = CafNumber::first(year)?;
        let attempts = self.config.max_number_attempts.max(1);

        let mut caf = CorrectiveActionForm {
            id: CafId::new(),
            number: first,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            category: draft.category,
            assigned_to: draft.assigned_to,
            created_by: draft.created_by,
            organization_id: draft.organization_id,
            inspection_id: draft.inspection_id,
            violation_id: draft.primary,
            covered_violations: draft.violations,
            due_date: self.config.due_date(draft.priority, now),
            requires_approval: self.config.requires_approval,
            created_at: now,
        };

        let _guard = self.numbering.lock().await;
        for attempt in 1..=attempts {
            caf.number = match self.store.latest_number(year).await? {
                Some(latest) => latest.next(),
                None => first,
            };

            match self.store.insert_caf(&caf).await {
                Ok(()) => {
                    metrics::counter!("dotc_cafs_created_total", "category" => caf.category.as_str())
                        .increment(1);
                    tracing::info!(
                        caf_number = %caf.number,
                        caf_id = %caf.id,
                        inspection_id = %caf.inspection_id,
                        category = %caf.category,
                        priority = caf.priority.as_str(),
                        assigned_to = %caf.assigned_to,
                        "created corrective action form"
                    );
                    return Ok(caf);
                }
                Err(StoreError::DuplicateNumber(taken)) => {
                    metrics::counter!("dotc_caf_number_conflicts_total").increment(1);
                    tracing::warn!(
                        caf_number = %taken,
                        attempt,
                        max_attempts = attempts,
                        "CAF number already taken, retrying with a fresh read"
                    );
                }
                Err(StoreError::AlreadyLinked(violation_id)) => {
                    return Err(EngineError::AlreadyLinked(violation_id));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::NumberAllocationExhausted { year, attempts })
    }
}

/// Split violations into non-empty category groups, in category order.
/// Input order is preserved inside each group.
fn partition(violations: Vec<Violation>) -> Vec<(ResponsibilityCategory, Vec<Violation>)> {
    let mut groups: Vec<(ResponsibilityCategory, Vec<Violation>)> = ResponsibilityCategory::all()
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();
    for v in violations {
        let category = classify(&v);
        if let Some((_, group)) = groups.iter_mut().find(|(c, _)| *c == category) {
            group.push(v);
        }
    }
    groups.retain(|(_, group)| !group.is_empty());
    groups
}

fn skip_group(
    inspection_id: InspectionId,
    category: ResponsibilityCategory,
    reason: &'static str,
    violations: usize,
) {
    metrics::counter!(
        "dotc_caf_buckets_skipped_total",
        "category" => category.as_str(),
        "reason" => reason
    )
    .increment(1);
    tracing::warn!(
        inspection_id = %inspection_id,
        category = %category,
        reason,
        violations,
        "skipped CAF group"
    );
}
