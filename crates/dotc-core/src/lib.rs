//! # dotc-core — Foundational Types for the Fleet-Compliance Tracker
//!
//! Every other crate in the workspace depends on `dotc-core`; it depends on
//! nothing internal. It carries the vocabulary of the corrective action form
//! (CAF) subsystem and nothing else: no I/O, no persistence, no HTTP.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `OrganizationId`, `StaffId`,
//!    `InspectionId`, `ViolationId`, `EquipmentId`, `CafId` are distinct
//!    types. You cannot route a CAF to an inspection ID by accident.
//!
//! 2. **Closed enumerations.** `ResponsibilityCategory` and `Priority` are
//!    exhaustive enums; adding a variant forces every `match` to handle it.
//!
//! 3. **Typed CAF numbers.** `CafNumber` parses and formats the
//!    `CAF-<year>-<sequence>` identifier in one place.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dotc-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod domain;
pub mod error;
pub mod identity;
pub mod number;
pub mod records;

pub use domain::{LookupResponsibility, Priority, ResponsibilityCategory, ViolationTypeTag};
pub use error::ValidationError;
pub use identity::{CafId, EquipmentId, InspectionId, OrganizationId, StaffId, ViolationId};
pub use number::CafNumber;
pub use records::{
    CorrectiveActionForm, EquipmentInfo, StaffMember, Violation, ViolationCodeLookup,
};
