//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the CAF subsystem touches.
//! These prevent accidental identifier confusion: you cannot pass a
//! `StaffId` where an `OrganizationId` is expected.
//!
//! All identifiers serialize transparently as a bare UUID so that JSON
//! payloads and database columns stay plain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$ty> for Uuid {
            fn from(id: $ty) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a motor carrier organization.
    OrganizationId,
    "org"
);

uuid_identifier!(
    /// Unique identifier for a staff member (person record).
    StaffId,
    "staff"
);

uuid_identifier!(
    /// Unique identifier for a roadside inspection event.
    InspectionId,
    "inspection"
);

uuid_identifier!(
    /// Unique identifier for a single violation cited on an inspection.
    ViolationId,
    "violation"
);

uuid_identifier!(
    /// Unique identifier for a piece of equipment (tractor, trailer).
    EquipmentId,
    "equipment"
);

uuid_identifier!(
    /// Unique identifier for a corrective action form record.
    CafId,
    "caf"
);
