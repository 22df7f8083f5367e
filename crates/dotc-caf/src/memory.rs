//! # In-Memory Store
//!
//! Thread-safe, cloneable implementation of every store contract, used for
//! tests, CLI previews and the API's development mode (no `DATABASE_URL`).
//!
//! All operations are synchronous under a `parking_lot::RwLock`; the lock is
//! never held across an `.await`. Clones share the same data.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, StaffId, StaffMember,
    Violation, ViolationId,
};
use parking_lot::RwLock;

use crate::store::{CafStore, StaffQuery, StaffStore, StoreError, ViolationStore};

#[derive(Debug, Clone)]
struct StaffEntry {
    member: StaffMember,
    role_active: bool,
}

impl StaffEntry {
    fn eligible_in(&self, organization_id: OrganizationId) -> bool {
        self.role_active && self.member.active && self.member.organization_id == organization_id
    }
}

#[derive(Debug, Default)]
struct Inner {
    inspections: HashMap<InspectionId, OrganizationId>,
    violations: Vec<Violation>,
    staff: Vec<StaffEntry>,
    cafs: Vec<CorrectiveActionForm>,
    links: HashMap<ViolationId, CafId>,
    numbers: HashSet<CafNumber>,
}

/// In-memory store. Insertion order is the stable order for every query.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an inspection and the organization that owns it.
    pub fn add_inspection(&self, inspection_id: InspectionId, organization_id: OrganizationId) {
        self.inner
            .write()
            .inspections
            .insert(inspection_id, organization_id);
    }

    pub fn add_violation(&self, violation: Violation) {
        self.inner.write().violations.push(violation);
    }

    /// Add a staff member with an active role in their organization.
    pub fn add_staff(&self, member: StaffMember) {
        self.inner.write().staff.push(StaffEntry {
            member,
            role_active: true,
        });
    }

    /// Activate or deactivate a staff member's organizational role.
    /// Returns `false` if the staff member is unknown.
    pub fn set_role_active(&self, staff_id: StaffId, active: bool) -> bool {
        let mut guard = self.inner.write();
        match guard.staff.iter_mut().find(|e| e.member.id == staff_id) {
            Some(entry) => {
                entry.role_active = active;
                true
            }
            None => false,
        }
    }

    /// All CAFs, in creation order.
    pub fn all_cafs(&self) -> Vec<CorrectiveActionForm> {
        self.inner.read().cafs.clone()
    }
}

#[async_trait]
impl ViolationStore for InMemoryStore {
    async fn unlinked_violations(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Vec<Violation>, StoreError> {
        let guard = self.inner.read();
        Ok(guard
            .violations
            .iter()
            .filter(|v| v.inspection_id == inspection_id && !guard.links.contains_key(&v.id))
            .cloned()
            .collect())
    }

    async fn violation(&self, id: ViolationId) -> Result<Option<Violation>, StoreError> {
        Ok(self
            .inner
            .read()
            .violations
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn inspection_organization(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Option<OrganizationId>, StoreError> {
        Ok(self.inner.read().inspections.get(&inspection_id).copied())
    }
}

#[async_trait]
impl StaffStore for InMemoryStore {
    async fn find_staff(
        &self,
        organization_id: OrganizationId,
        query: &StaffQuery,
    ) -> Result<Option<StaffMember>, StoreError> {
        let guard = self.inner.read();
        let mut eligible = guard.staff.iter().filter(|e| e.eligible_in(organization_id));
        let found = match query {
            StaffQuery::Keywords(keywords) => {
                eligible.find(|e| e.member.matches_any_keyword(keywords))
            }
            StaffQuery::CanApprove => eligible.find(|e| e.member.can_approve_cafs),
            StaffQuery::AnyActive => eligible.next(),
        };
        Ok(found.map(|e| e.member.clone()))
    }

    async fn active_member(
        &self,
        organization_id: OrganizationId,
        staff_id: StaffId,
    ) -> Result<Option<StaffMember>, StoreError> {
        Ok(self
            .inner
            .read()
            .staff
            .iter()
            .find(|e| e.member.id == staff_id && e.eligible_in(organization_id))
            .map(|e| e.member.clone()))
    }
}

#[async_trait]
impl CafStore for InMemoryStore {
    async fn latest_number(&self, year: i32) -> Result<Option<CafNumber>, StoreError> {
        Ok(self
            .inner
            .read()
            .numbers
            .iter()
            .filter(|n| n.year() == year)
            .max()
            .copied())
    }

    async fn insert_caf(&self, caf: &CorrectiveActionForm) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        if guard.numbers.contains(&caf.number) {
            return Err(StoreError::DuplicateNumber(caf.number));
        }
        if let Some(linked) = caf
            .covered_violations
            .iter()
            .chain(std::iter::once(&caf.violation_id))
            .find(|v| guard.links.contains_key(*v))
        {
            return Err(StoreError::AlreadyLinked(*linked));
        }

        guard.numbers.insert(caf.number);
        guard.links.insert(caf.violation_id, caf.id);
        for v in &caf.covered_violations {
            guard.links.insert(*v, caf.id);
        }
        guard.cafs.push(caf.clone());
        Ok(())
    }

    async fn violation_has_caf(&self, violation_id: ViolationId) -> Result<bool, StoreError> {
        Ok(self.inner.read().links.contains_key(&violation_id))
    }

    async fn caf(&self, id: CafId) -> Result<Option<CorrectiveActionForm>, StoreError> {
        Ok(self.inner.read().cafs.iter().find(|c| c.id == id).cloned())
    }

    async fn cafs_for_organization(
        &self,
        organization_id: OrganizationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CorrectiveActionForm>, StoreError> {
        Ok(self
            .inner
            .read()
            .cafs
            .iter()
            .rev()
            .filter(|c| c.organization_id == organization_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
