//! # Responsibility & Priority Vocabulary
//!
//! The closed enumerations the CAF engine reasons over:
//!
//! - [`ResponsibilityCategory`]: who owns fixing a violation.
//! - [`Priority`]: how urgently the fix is due.
//! - [`LookupResponsibility`]: the authoritative type carried by the
//!   canonical violation-code lookup table (`DRIVER` / `VEHICLE` / `OTHER`).
//! - [`ViolationTypeTag`]: the explicit type tag recorded on a violation.
//!
//! Upstream data arrives with inconsistent casing and vocabulary, so the
//! two "raw" enums parse leniently. The engine's classifier is the only
//! place that decides how they combine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// The party responsible for correcting a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsibilityCategory {
    /// Driver qualification and driver performance (49 CFR 391, 392, 395).
    Driver,
    /// Vehicle condition, inspection, repair and maintenance (393, 396).
    Equipment,
    /// Carrier-level obligations (390) and anything unclassifiable.
    Company,
}

impl ResponsibilityCategory {
    /// All categories in canonical processing order.
    pub fn all() -> &'static [ResponsibilityCategory] {
        &[Self::Driver, Self::Equipment, Self::Company]
    }

    /// Snake-case identifier; matches the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Equipment => "equipment",
            Self::Company => "company",
        }
    }

    /// Human-readable label used in CAF titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Driver => "Driver",
            Self::Equipment => "Equipment",
            Self::Company => "Company",
        }
    }
}

impl std::fmt::Display for ResponsibilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponsibilityCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(Self::Driver),
            "equipment" => Ok(Self::Equipment),
            "company" => Ok(Self::Company),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// Urgency of a corrective action.
///
/// The `Ord` derivation follows declaration order: `Medium < High < Critical`,
/// so the priority of a group is simply the maximum over its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Routine correction.
    Medium,
    /// Known high-severity violation.
    High,
    /// Out-of-service condition.
    Critical,
}

impl Priority {
    /// Snake-case identifier; matches the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ValidationError::UnknownPriority(s.to_string())),
        }
    }
}

/// Responsibility type carried by the canonical violation-code lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupResponsibility {
    Driver,
    Vehicle,
    Other,
}

impl LookupResponsibility {
    /// Upper-case identifier as stored in the lookup table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "DRIVER",
            Self::Vehicle => "VEHICLE",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for LookupResponsibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRIVER" => Ok(Self::Driver),
            "VEHICLE" => Ok(Self::Vehicle),
            "OTHER" => Ok(Self::Other),
            _ => Err(ValidationError::UnknownLookupResponsibility(s.to_string())),
        }
    }
}

/// Explicit violation type tag recorded on the violation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationTypeTag {
    DriverQualification,
    DriverPerformance,
    Equipment,
    Company,
}

impl ViolationTypeTag {
    /// Parse a free-form tag, tolerating case, spaces and hyphens.
    ///
    /// Returns `None` for anything that does not name a known tag; callers
    /// fall through to the next classification source.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "DRIVER_QUALIFICATION" | "DRIVER_QUAL" | "DQ" => Some(Self::DriverQualification),
            "DRIVER_PERFORMANCE" | "DRIVER" | "HOS" | "HOURS_OF_SERVICE" => {
                Some(Self::DriverPerformance)
            }
            "EQUIPMENT" | "VEHICLE" | "VEHICLE_MAINTENANCE" | "MAINTENANCE" => {
                Some(Self::Equipment)
            }
            "COMPANY" | "CARRIER" => Some(Self::Company),
            _ => None,
        }
    }

    /// The responsibility category this tag implies.
    pub fn category(&self) -> ResponsibilityCategory {
        match self {
            Self::DriverQualification | Self::DriverPerformance => {
                ResponsibilityCategory::Driver
            }
            Self::Equipment => ResponsibilityCategory::Equipment,
            Self::Company => ResponsibilityCategory::Company,
        }
    }
}
