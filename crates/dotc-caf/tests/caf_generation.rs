//! End-to-end CAF generation scenarios against the in-memory store.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dotc_caf::store::{CafStore, StaffQuery, StaffStore, StoreError, ViolationStore};
use dotc_caf::{CafEngine, EngineConfig, EngineError, InMemoryStore, RoutingTable};
use dotc_core::{
    CafId, CafNumber, CorrectiveActionForm, InspectionId, OrganizationId, Priority,
    ResponsibilityCategory, StaffId, StaffMember, Violation, ViolationId,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
}

fn make_violation(inspection_id: InspectionId, code: &str, oos: bool) -> Violation {
    Violation {
        id: ViolationId::new(),
        inspection_id,
        code: code.into(),
        description: format!("Cited under {code}"),
        severity: None,
        out_of_service: oos,
        out_of_service_date: None,
        type_tag: None,
        code_lookup: None,
        equipment: None,
    }
}

fn make_staff(
    org: OrganizationId,
    name: &str,
    position: Option<&str>,
    department: Option<&str>,
    approver: bool,
) -> StaffMember {
    StaffMember {
        id: StaffId::new(),
        organization_id: org,
        name: name.into(),
        position: position.map(String::from),
        department: department.map(String::from),
        can_approve_cafs: approver,
        active: true,
    }
}

struct Fixture {
    store: InMemoryStore,
    engine: CafEngine,
    org: OrganizationId,
    inspection: InspectionId,
}

fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let org = OrganizationId::new();
    let inspection = InspectionId::new();
    store.add_inspection(inspection, org);
    let engine = CafEngine::new(Arc::new(store.clone()), Arc::new(RoutingTable::builtin()));
    Fixture {
        store,
        engine,
        org,
        inspection,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regenerating_an_inspection_creates_nothing_new() {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Dana", Some("Director"), None, true));
    for code in ["391.11", "393.9", "390.19"] {
        f.store.add_violation(make_violation(f.inspection, code, false));
    }

    let first = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(first.len(), 3);

    let second = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert!(second.is_empty());
    assert_eq!(f.store.all_cafs().len(), 3);
}

#[tokio::test]
async fn groups_by_category_and_takes_group_priority() {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Alex", Some("Operations Lead"), None, false));
    f.store
        .add_staff(make_staff(f.org, "Blake", None, Some("Fleet"), false));
    f.store.add_violation(make_violation(f.inspection, "391.1", false));
    f.store.add_violation(make_violation(f.inspection, "393.9", false));
    f.store.add_violation(make_violation(f.inspection, "393.9", true));

    let cafs = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 2);

    let driver = &cafs[0];
    assert_eq!(driver.category, ResponsibilityCategory::Driver);
    assert_eq!(driver.priority, Priority::Medium);
    assert_eq!(driver.due_date, now() + Duration::days(30));

    let equipment = &cafs[1];
    assert_eq!(equipment.category, ResponsibilityCategory::Equipment);
    assert_eq!(equipment.priority, Priority::Critical);
    assert_eq!(equipment.covered_violations.len(), 2);
    assert_eq!(equipment.due_date, now() + Duration::days(15));
}

#[tokio::test]
async fn falls_back_to_approver_when_no_keyword_matches() {
    let f = fixture();
    let clerk = make_staff(f.org, "Casey", Some("Clerk"), Some("Billing"), false);
    let approver = make_staff(f.org, "Robin", Some("Owner"), None, true);
    f.store.add_staff(clerk);
    f.store.add_staff(approver.clone());
    f.store.add_violation(make_violation(f.inspection, "392.2A(1)", false));

    let cafs = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 1);
    assert_eq!(cafs[0].assigned_to, approver.id);
}

#[tokio::test]
async fn group_without_eligible_staff_stays_pending_until_staff_exists() {
    let f = fixture();
    let inactive = make_staff(f.org, "Jo", Some("Safety Director"), None, true);
    f.store.add_staff(inactive.clone());
    f.store.set_role_active(inactive.id, false);
    let driver_violation = make_violation(f.inspection, "391.45", false);
    let driver_id = driver_violation.id;
    f.store.add_violation(driver_violation);

    let cafs = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert!(cafs.is_empty());
    assert!(!f.store.violation_has_caf(driver_id).await.unwrap());

    // Staff appears later: the skipped violation is still pending and now succeeds.
    f.store
        .add_staff(make_staff(f.org, "Lee", None, Some("Operations"), false));
    let cafs = f
        .engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 1);
    assert_eq!(cafs[0].violation_id, driver_id);
}

#[tokio::test]
async fn safety_manager_and_fleet_tech_scenario() {
    let f = fixture();
    let safety = make_staff(
        f.org,
        "Pat",
        Some("Safety Manager"),
        Some("Safety"),
        true,
    );
    let tech = make_staff(f.org, "Sam", Some("Fleet Tech"), Some("Maintenance"), false);
    f.store.add_staff(safety.clone());
    f.store.add_staff(tech.clone());
    f.store.add_violation(make_violation(f.inspection, "392.2A(1)", false));
    f.store.add_violation(make_violation(f.inspection, "396.3", true));

    let requester = StaffId::new();
    let cafs = f
        .engine
        .generate_cafs_at(f.inspection, requester, now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 2);

    let driver = cafs
        .iter()
        .find(|c| c.category == ResponsibilityCategory::Driver)
        .unwrap();
    assert_eq!(driver.assigned_to, safety.id);
    assert_eq!(driver.priority, Priority::High);
    assert_eq!(driver.due_date, now() + Duration::days(30));
    assert!(driver.title.starts_with("Driver - 392.2A(1): "));

    let equipment = cafs
        .iter()
        .find(|c| c.category == ResponsibilityCategory::Equipment)
        .unwrap();
    assert_eq!(equipment.assigned_to, tech.id);
    assert_eq!(equipment.priority, Priority::Critical);
    assert_eq!(equipment.due_date, now() + Duration::days(15));
    assert!(equipment.description.contains("OUT OF SERVICE"));

    for caf in &cafs {
        assert_eq!(caf.created_by, requester);
        assert_eq!(caf.organization_id, f.org);
        assert_eq!(caf.inspection_id, f.inspection);
    }
}

#[tokio::test]
async fn identifiers_are_unique_and_strictly_increasing() {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Kim", Some("Compliance"), None, true));

    let mut numbers = Vec::new();
    for i in 0..12 {
        let inspection = InspectionId::new();
        f.store.add_inspection(inspection, f.org);
        f.store
            .add_violation(make_violation(inspection, &format!("390.{i}"), false));
        let cafs = f
            .engine
            .generate_cafs_at(inspection, StaffId::new(), now())
            .await
            .unwrap();
        numbers.extend(cafs.into_iter().map(|c| c.number));
    }

    assert_eq!(numbers.len(), 12);
    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(numbers[0].to_string(), "CAF-2026-0001");
    assert_eq!(numbers[11].to_string(), "CAF-2026-0012");
}

#[tokio::test]
async fn concurrent_generation_never_reuses_a_number() {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Kim", Some("Compliance"), None, true));
    let engine = Arc::new(f.engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let inspection = InspectionId::new();
        f.store.add_inspection(inspection, f.org);
        f.store.add_violation(make_violation(inspection, "391.1", false));
        f.store.add_violation(make_violation(inspection, "393.9", false));
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .generate_cafs_at(inspection, StaffId::new(), now())
                .await
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().len(), 2);
    }

    let mut seqs: Vec<u32> = f
        .store
        .all_cafs()
        .iter()
        .map(|c| c.number.sequence())
        .collect();
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=16).collect::<Vec<u32>>());
}

// ---------------------------------------------------------------------------
// Number allocation retry
// ---------------------------------------------------------------------------

/// Delegates to an [`InMemoryStore`] but reports a stale latest number for
/// the first `stale_reads` reads, as a concurrent writer in another process
/// would cause.
/// Wraps the in-memory store to simulate another process racing this one.
///
/// The first `stale_reads` number reads return `stale`. With `rival_link`
/// set, the first insert is preceded by a rival CAF claiming the same
/// primary violation.
struct RacyStore {
    inner: InMemoryStore,
    stale: Option<CafNumber>,
    stale_reads: AtomicU32,
    rival_link: AtomicBool,
}

#[async_trait]
impl ViolationStore for RacyStore {
    async fn unlinked_violations(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Vec<Violation>, StoreError> {
        self.inner.unlinked_violations(inspection_id).await
    }

    async fn violation(&self, id: ViolationId) -> Result<Option<Violation>, StoreError> {
        self.inner.violation(id).await
    }

    async fn inspection_organization(
        &self,
        inspection_id: InspectionId,
    ) -> Result<Option<OrganizationId>, StoreError> {
        self.inner.inspection_organization(inspection_id).await
    }
}

#[async_trait]
impl StaffStore for RacyStore {
    async fn find_staff(
        &self,
        organization_id: OrganizationId,
        query: &StaffQuery,
    ) -> Result<Option<StaffMember>, StoreError> {
        self.inner.find_staff(organization_id, query).await
    }

    async fn active_member(
        &self,
        organization_id: OrganizationId,
        staff_id: StaffId,
    ) -> Result<Option<StaffMember>, StoreError> {
        self.inner.active_member(organization_id, staff_id).await
    }
}

#[async_trait]
impl CafStore for RacyStore {
    async fn latest_number(&self, year: i32) -> Result<Option<CafNumber>, StoreError> {
        let remaining = self.stale_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.stale_reads.store(remaining - 1, Ordering::SeqCst);
            return Ok(self.stale);
        }
        self.inner.latest_number(year).await
    }

    async fn insert_caf(&self, caf: &CorrectiveActionForm) -> Result<(), StoreError> {
        if self.rival_link.swap(false, Ordering::SeqCst) {
            let rival = CorrectiveActionForm {
                id: CafId::new(),
                number: CafNumber::new(2026, 9000).unwrap(),
                covered_violations: vec![caf.violation_id],
                ..caf.clone()
            };
            self.inner.insert_caf(&rival).await?;
        }
        self.inner.insert_caf(caf).await
    }

    async fn violation_has_caf(&self, violation_id: ViolationId) -> Result<bool, StoreError> {
        self.inner.violation_has_caf(violation_id).await
    }

    async fn caf(&self, id: CafId) -> Result<Option<CorrectiveActionForm>, StoreError> {
        self.inner.caf(id).await
    }

    async fn cafs_for_organization(
        &self,
        organization_id: OrganizationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CorrectiveActionForm>, StoreError> {
        self.inner
            .cafs_for_organization(organization_id, limit, offset)
            .await
    }
}

/// An existing CAF-2026-0001 plus a store that hides it from the first
/// `stale_reads` reads.
async fn stale_setup(stale_reads: u32) -> (InMemoryStore, CafEngine, InspectionId) {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Kim", Some("Compliance"), None, true));

    let seed = f.inspection;
    f.store.add_violation(make_violation(seed, "390.1", false));
    let seeded = f
        .engine
        .generate_cafs_at(seed, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(seeded[0].number.sequence(), 1);

    let stale = RacyStore {
        inner: f.store.clone(),
        stale: None,
        stale_reads: AtomicU32::new(stale_reads),
        rival_link: AtomicBool::new(false),
    };
    let engine = CafEngine::new(Arc::new(stale), Arc::new(RoutingTable::builtin()));

    let inspection = InspectionId::new();
    f.store.add_inspection(inspection, f.org);
    f.store.add_violation(make_violation(inspection, "390.2", false));
    (f.store, engine, inspection)
}

#[tokio::test]
async fn retries_with_a_fresh_read_after_a_number_collision() {
    let (store, engine, inspection) = stale_setup(2).await;

    let cafs = engine
        .generate_cafs_at(inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 1);
    assert_eq!(cafs[0].number.to_string(), "CAF-2026-0002");
    assert_eq!(store.all_cafs().len(), 2);
}

#[tokio::test]
async fn exhausted_allocation_skips_the_group() {
    let (store, engine, inspection) = stale_setup(3).await;

    let cafs = engine
        .generate_cafs_at(inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert!(cafs.is_empty());
    assert_eq!(store.all_cafs().len(), 1);
}

#[tokio::test]
async fn exhausted_group_does_not_stop_the_next_group() {
    let (store, engine, inspection) = stale_setup(3).await;
    let driver = make_violation(inspection, "391.1", false);
    let driver_id = driver.id;
    store.add_violation(driver);

    // Driver is processed first and burns every stale read; Company then
    // sees the real latest number.
    let cafs = engine
        .generate_cafs_at(inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 1);
    assert_eq!(cafs[0].category, ResponsibilityCategory::Company);
    assert_eq!(cafs[0].number.to_string(), "CAF-2026-0002");
    assert!(!store.violation_has_caf(driver_id).await.unwrap());
    assert_eq!(store.all_cafs().len(), 2);
}

#[tokio::test]
async fn group_linked_by_a_concurrent_run_is_skipped_and_the_rest_kept() {
    let f = fixture();
    f.store
        .add_staff(make_staff(f.org, "Kim", Some("Compliance"), None, true));
    let driver = make_violation(f.inspection, "391.1", false);
    let equipment = make_violation(f.inspection, "393.9", false);
    let (driver_id, equipment_id) = (driver.id, equipment.id);
    f.store.add_violation(driver);
    f.store.add_violation(equipment);

    let racy = RacyStore {
        inner: f.store.clone(),
        stale: None,
        stale_reads: AtomicU32::new(0),
        rival_link: AtomicBool::new(true),
    };
    let engine = CafEngine::new(Arc::new(racy), Arc::new(RoutingTable::builtin()));

    let cafs = engine
        .generate_cafs_at(f.inspection, StaffId::new(), now())
        .await
        .unwrap();
    assert_eq!(cafs.len(), 1);
    assert_eq!(cafs[0].category, ResponsibilityCategory::Equipment);
    assert_eq!(cafs[0].violation_id, equipment_id);
    assert_eq!(cafs[0].number.to_string(), "CAF-2026-9001");

    let all = f.store.all_cafs();
    assert_eq!(all.len(), 2);
    let rival = all.iter().find(|c| c.violation_id == driver_id).unwrap();
    assert_eq!(rival.number.to_string(), "CAF-2026-9000");
}

#[tokio::test]
async fn exhausted_allocation_is_an_error_for_single_violations() {
    let (store, _, inspection) = stale_setup(0).await;
    let stale = RacyStore {
        inner: store.clone(),
        stale: None,
        stale_reads: AtomicU32::new(u32::MAX),
        rival_link: AtomicBool::new(false),
    };
    let engine = CafEngine::with_config(
        Arc::new(stale),
        Arc::new(RoutingTable::builtin()),
        EngineConfig {
            max_number_attempts: 2,
            ..EngineConfig::default()
        },
    );

    let pending = store.unlinked_violations(inspection).await.unwrap();
    let err = engine
        .generate_caf_from_violation_at(pending[0].id, StaffId::new(), None, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::NumberAllocationExhausted {
            year: 2026,
            attempts: 2
        }
    ));
}
