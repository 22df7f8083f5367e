//! # dotc-caf — Corrective Action Form Engine
//!
//! Turns the regulatory violations cited on a roadside inspection into
//! corrective action forms (CAFs), one per responsibility category.
//!
//! ## Pipeline
//!
//! ```text
//! unlinked violations ─► classifier ─► partition by category
//!                                          │
//!              ┌───────────────────────────┘ (per non-empty group)
//!              ▼
//!   priority ─► staff router ─► narrative ─► number allocation ─► persist
//! ```
//!
//! - [`classifier`]: violation → Driver / Equipment / Company.
//! - [`priority`]: out-of-service and known high-severity codes → urgency.
//! - [`routing`]: category → responsible staff member, with fallbacks.
//! - [`narrative`]: title and structured description for a group.
//! - [`engine`]: orchestration, due dates, sequential `CAF-<year>-<seq>`
//!   numbering with bounded retry, partial-failure semantics.
//! - [`store`]: persistence contracts; [`memory`] is the in-process
//!   implementation used by tests, previews and development mode.
//!
//! Classification, priority and narrative are pure functions. Only number
//! allocation touches shared mutable state.

pub mod classifier;
pub mod engine;
pub mod memory;
pub mod narrative;
pub mod priority;
pub mod routing;
pub mod store;

pub use classifier::classify;
pub use engine::{CafEngine, EngineConfig, EngineError};
pub use memory::InMemoryStore;
pub use narrative::{describe, Narrative};
pub use priority::{group_priority, priority};
pub use routing::{RouteTier, RoutedStaff, RoutingTable, RoutingTableError, StaffRouter};
pub use store::{CafRepository, CafStore, StaffQuery, StaffStore, StoreError, ViolationStore};
