//! # Error Types
//!
//! Errors raised when parsing or constructing core primitives.

use thiserror::Error;

/// Validation failure for a domain primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A CAF number did not match `CAF-<year>-<sequence>`.
    #[error("invalid CAF number {value:?}: {reason}")]
    InvalidCafNumber {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A responsibility category string was not recognised.
    #[error("unknown responsibility category: {0:?}")]
    UnknownCategory(String),

    /// A priority string was not recognised.
    #[error("unknown priority: {0:?}")]
    UnknownPriority(String),

    /// A lookup-table responsibility value was not one of DRIVER/VEHICLE/OTHER.
    #[error("unknown lookup responsibility: {0:?}")]
    UnknownLookupResponsibility(String),
}
