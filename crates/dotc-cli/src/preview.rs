//! # Preview CLI — Offline CAF generation from a JSON fixture.
//!
//! The fixture seeds an in-memory store with inspections, staff and
//! violations. Generation then runs exactly as the API would, against a
//! fixed clock, and the resulting forms are printed.
//!
//! ```json
//! {
//!   "now": "2026-03-10T09:30:00Z",
//!   "requested_by": "6c1f…",
//!   "inspections": [{ "id": "…", "organization_id": "…" }],
//!   "staff": [{ "id": "…", "organization_id": "…", "name": "Sam Rivera",
//!               "position": "Safety Manager", "department": null,
//!               "can_approve_cafs": true, "active": true }],
//!   "violations": [{ "id": "…", "inspection_id": "…", "code": "393.9",
//!                    "description": "…", "out_of_service": true }]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use dotc_caf::{CafEngine, InMemoryStore, RoutingTable};
use dotc_core::{
    CorrectiveActionForm, InspectionId, OrganizationId, StaffId, StaffMember, Violation,
};
use serde::Deserialize;
use uuid::Uuid;

/// Preview subcommand arguments.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// JSON fixture with inspections, staff and violations.
    pub fixture: PathBuf,

    /// Only generate for this inspection. Defaults to every inspection in
    /// the fixture, in file order.
    #[arg(long)]
    pub inspection: Option<Uuid>,

    /// YAML routing table. Defaults to the built-in keywords.
    #[arg(long)]
    pub routing: Option<PathBuf>,

    /// Clock used for due dates and numbering. Overrides the fixture's `now`.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct FixtureInspection {
    pub id: InspectionId,
    pub organization_id: OrganizationId,
}

/// Seed data for a preview run.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub now: Option<DateTime<Utc>>,
    /// Acting staff member. Defaults to the first staff entry.
    pub requested_by: Option<StaffId>,
    pub inspections: Vec<FixtureInspection>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl Fixture {
    pub fn parse(raw: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(raw).context("malformed fixture")?;
        fixture.check()?;
        Ok(fixture)
    }

    fn check(&self) -> Result<()> {
        if self.inspections.is_empty() {
            bail!("fixture lists no inspections");
        }
        for v in &self.violations {
            if !self.inspections.iter().any(|i| i.id == v.inspection_id) {
                bail!(
                    "violation {} references unknown inspection {}",
                    v.id.as_uuid(),
                    v.inspection_id.as_uuid()
                );
            }
        }
        Ok(())
    }

    fn acting_staff(&self) -> Result<StaffId> {
        self.requested_by
            .or_else(|| self.staff.first().map(|s| s.id))
            .context("fixture has no requested_by and no staff to act as")
    }

    /// Load the fixture into a fresh in-memory store.
    pub fn seed(&self) -> InMemoryStore {
        let store = InMemoryStore::new();
        for inspection in &self.inspections {
            store.add_inspection(inspection.id, inspection.organization_id);
        }
        for member in &self.staff {
            store.add_staff(member.clone());
        }
        for violation in &self.violations {
            store.add_violation(violation.clone());
        }
        store
    }
}

/// Run generation for the selected inspections. Returns every CAF created,
/// in generation order.
pub async fn generate(
    fixture: &Fixture,
    routing: RoutingTable,
    inspection: Option<InspectionId>,
    now: DateTime<Utc>,
) -> Result<Vec<CorrectiveActionForm>> {
    let targets: Vec<InspectionId> = match inspection {
        Some(id) => {
            if !fixture.inspections.iter().any(|i| i.id == id) {
                bail!("inspection {} is not in the fixture", id.as_uuid());
            }
            vec![id]
        }
        None => fixture.inspections.iter().map(|i| i.id).collect(),
    };
    let requested_by = fixture.acting_staff()?;

    let engine = CafEngine::new(Arc::new(fixture.seed()), Arc::new(routing));
    let mut cafs = Vec::new();
    for inspection_id in targets {
        let created = engine
            .generate_cafs_at(inspection_id, requested_by, now)
            .await
            .with_context(|| format!("generation failed for inspection {}", inspection_id.as_uuid()))?;
        tracing::info!(
            inspection_id = %inspection_id,
            count = created.len(),
            "preview generated"
        );
        cafs.extend(created);
    }
    Ok(cafs)
}

/// Execute the preview subcommand.
pub fn run_preview(args: &PreviewArgs) -> Result<u8> {
    let fixture = Fixture::parse(&crate::read_file(&args.fixture)?)
        .with_context(|| format!("invalid fixture {}", args.fixture.display()))?;
    let routing = load_routing(args.routing.as_deref())?;
    let now = args.at.or(fixture.now).unwrap_or_else(Utc::now);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let cafs = runtime.block_on(generate(
        &fixture,
        routing,
        args.inspection.map(InspectionId::from_uuid),
        now,
    ))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cafs)?);
    } else {
        print!("{}", render_text(&cafs, &fixture.staff));
    }
    Ok(0)
}

fn load_routing(path: Option<&Path>) -> Result<RoutingTable> {
    match path {
        Some(p) => RoutingTable::load(p)
            .with_context(|| format!("invalid routing table {}", p.display())),
        None => Ok(RoutingTable::builtin()),
    }
}

/// Human-readable listing of generated CAFs.
pub fn render_text(cafs: &[CorrectiveActionForm], staff: &[StaffMember]) -> String {
    if cafs.is_empty() {
        return "No corrective action forms generated.\n".to_string();
    }
    let names: HashMap<StaffId, &str> = staff.iter().map(|s| (s.id, s.name.as_str())).collect();

    let mut out = String::new();
    for caf in cafs {
        let assignee = names
            .get(&caf.assigned_to)
            .copied()
            .map(str::to_string)
            .unwrap_or_else(|| caf.assigned_to.as_uuid().to_string());
        out.push_str(&format!("{}  [{}] {}\n", caf.number, caf.priority, caf.title));
        out.push_str(&format!(
            "  assigned to: {assignee}\n  due:         {}\n  violations:  {}\n\n",
            caf.due_date.format("%Y-%m-%d"),
            caf.covered_violations.len()
        ));
        for line in caf.description.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(&format!("{} corrective action form(s)\n", cafs.len()));
    out
}
