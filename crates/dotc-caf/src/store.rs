//! # Store Contracts
//!
//! The engine reads violations and staff and writes CAFs through these
//! traits. Two implementations exist: [`crate::memory::InMemoryStore`] and
//! the Postgres store in `dotc-api`.
//!
//! ## Uniqueness
//!
//! Implementations must reject a CAF whose number already exists with
//! [`StoreError::DuplicateNumber`], and a CAF covering a violation that is
//! already linked to another CAF with [`StoreError::AlreadyLinked`]. The
//! engine's retry and idempotency behaviour depend on both.

use async_trait::async_trait;
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, StaffId, StaffMember,
    Violation, ViolationId,
};
use thiserror::Error;

/// Errors raised by store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The CAF number is already taken (uniqueness constraint).
    #[error("CAF number {0} already exists")]
    DuplicateNumber(CafNumber),

    /// The violation is already covered by another CAF.
    #[error("{0} is already linked to a corrective action form")]
    AlreadyLinked(ViolationId),

    /// A stored value could not be decoded into a domain type.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure (connection, query, transaction).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Staff search criteria, tried by the router from most to least specific.
///
/// Every query is implicitly restricted to staff with an active role in the
/// organization and an active status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffQuery {
    /// Position or department contains any keyword (case-insensitive).
    Keywords(Vec<String>),
    /// Staff flagged as able to approve CAFs.
    CanApprove,
    /// Any eligible staff member.
    AnyActive,
}

#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Violations on the inspection that no CAF covers yet, in citation order.
    async fn unlinked_violations(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Vec<Violation>, StoreError>;

    async fn violation(&self, id: ViolationId) -> Result<Option<Violation>, StoreError>;

    /// The organization owning the inspection, if resolvable.
    async fn inspection_organization(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Option<OrganizationId>, StoreError>;
}

#[async_trait]
pub trait StaffStore: Send + Sync {
    /// First eligible staff member matching the query, in a stable order.
    async fn find_staff(
        &self,
        organization_id: OrganizationId,
        query: &StaffQuery,
    ) -> Result<Option<StaffMember>, StoreError>;

    /// The staff member, if currently eligible for routing in the organization.
    async fn active_member(
        &self,
        organization_id: OrganizationId,
        staff_id: StaffId,
    ) -> Result<Option<StaffMember>, StoreError>;
}

#[async_trait]
pub trait CafStore: Send + Sync {
    /// Highest CAF number allocated in `year`.
    async fn latest_number(&self, year: i32) -> Result<Option<CafNumber>, StoreError>;

    /// Atomically insert the CAF and link every violation it covers.
    async fn insert_caf(&self, caf: &CorrectiveActionForm) -> Result<(), StoreError>;

    async fn violation_has_caf(&self, violation_id: ViolationId) -> Result<bool, StoreError>;

    async fn caf(&self, id: CafId) -> Result<Option<CorrectiveActionForm>, StoreError>;

    /// CAFs of an organization, newest first.
    async fn cafs_for_organization(
        &self,
        organization_id: OrganizationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CorrectiveActionForm>, StoreError>;
}

/// Everything the engine needs from persistence.
pub trait CafRepository: ViolationStore + StaffStore + CafStore {}

impl<T: ViolationStore + StaffStore + CafStore> CafRepository for T {}
