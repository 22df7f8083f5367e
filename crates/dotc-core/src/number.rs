//! # CAF Numbers
//!
//! Human-readable sequential identifiers of the form `CAF-<year>-<sequence>`,
//! unique per calendar year. The sequence is zero-padded to four digits and
//! keeps growing past 9999 rather than wrapping.
//!
//! Allocation ("read the year's highest number, take the next one") lives in
//! the engine; this module only knows the format.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

const PREFIX: &str = "CAF-";

/// A parsed CAF number.
///
/// Ordering is by year, then sequence, so `max()` over a year's numbers
/// yields the most recently allocated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CafNumber {
    year: i32,
    sequence: u32,
}

impl CafNumber {
    /// Build a number from its parts. The sequence starts at 1.
    pub fn new(year: i32, sequence: u32) -> Result<Self, ValidationError> {
        if !(1000..=9999).contains(&year) {
            return Err(ValidationError::InvalidCafNumber {
                value: format!("{PREFIX}{year}-{sequence:04}"),
                reason: "year must have four digits".into(),
            });
        }
        if sequence == 0 {
            return Err(ValidationError::InvalidCafNumber {
                value: format!("{PREFIX}{year}-{sequence:04}"),
                reason: "sequence starts at 1".into(),
            });
        }
        Ok(Self { year, sequence })
    }

    /// The first number of a year (`CAF-<year>-0001`).
    pub fn first(year: i32) -> Result<Self, ValidationError> {
        Self::new(year, 1)
    }

    /// The number following this one in the same year.
    pub fn next(&self) -> Self {
        Self {
            year: self.year,
            sequence: self.sequence.saturating_add(1),
        }
    }

    /// The string prefix shared by every number of `year`, e.g. `CAF-2026-`.
    pub fn year_prefix(year: i32) -> String {
        format!("{PREFIX}{year}-")
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl std::fmt::Display for CafNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}-{:04}", self.year, self.sequence)
    }
}

impl FromStr for CafNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidCafNumber {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| invalid("missing CAF- prefix"))?;
        let (year, sequence) = rest
            .split_once('-')
            .ok_or_else(|| invalid("expected CAF-<year>-<sequence>"))?;

        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("year must have four digits"));
        }
        if sequence.len() < 4 || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("sequence must have at least four digits"));
        }

        let year: i32 = year.parse().map_err(|_| invalid("year out of range"))?;
        let sequence: u32 = sequence
            .parse()
            .map_err(|_| invalid("sequence out of range"))?;
        Self::new(year, sequence)
    }
}

impl Serialize for CafNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CafNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_four_digit_padding() {
        assert_eq!(CafNumber::first(2026).unwrap().to_string(), "CAF-2026-0001");
        assert_eq!(
            CafNumber::new(2026, 42).unwrap().to_string(),
            "CAF-2026-0042"
        );
    }

    #[test]
    fn sequence_grows_past_four_digits() {
        let n = CafNumber::new(2026, 9999).unwrap().next();
        assert_eq!(n.to_string(), "CAF-2026-10000");
        assert_eq!("CAF-2026-10000".parse::<CafNumber>().unwrap(), n);
    }

    #[test]
    fn next_stays_in_year() {
        let n = CafNumber::new(2025, 7).unwrap().next();
        assert_eq!(n.year(), 2025);
        assert_eq!(n.sequence(), 8);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in [
            "",
            "CAF-2026",
            "CAF-26-0001",
            "caf-2026-0001",
            "CAF-2026-1",
            "CAF-2026-0000",
            "CAF-2026-00a1",
            "NCR-2026-0001",
        ] {
            assert!(bad.parse::<CafNumber>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn ordering_is_year_then_sequence() {
        let a = CafNumber::new(2025, 900).unwrap();
        let b = CafNumber::new(2026, 1).unwrap();
        let c = CafNumber::new(2026, 2).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn year_prefix_matches_display() {
        let n = CafNumber::new(2026, 3).unwrap();
        assert!(n.to_string().starts_with(&CafNumber::year_prefix(2026)));
    }

    #[test]
    fn serializes_as_string() {
        let n = CafNumber::new(2026, 12).unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"CAF-2026-0012\"");
        let back: CafNumber = serde_json::from_str("\"CAF-2026-0012\"").unwrap();
        assert_eq!(back, n);
        assert!(serde_json::from_str::<CafNumber>("\"CAF-x\"").is_err());
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(year in 1000i32..=9999, seq in 1u32..1_000_000) {
            let n = CafNumber::new(year, seq).unwrap();
            prop_assert_eq!(n.to_string().parse::<CafNumber>().unwrap(), n);
        }
    }
}
