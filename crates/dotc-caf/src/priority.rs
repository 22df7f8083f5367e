//! # Priority Calculator
//!
//! Out-of-service is always Critical. Otherwise a violation whose code
//! contains one of [`HIGH_SEVERITY_CODE_FRAGMENTS`] is High, and everything
//! else is Medium.

use dotc_core::{Priority, Violation};

/// Code fragments that mark a violation as high severity.
///
/// Driver performance (speeding, drugs/alcohol, hours of service) and
/// safety-critical equipment (brakes, tires, inspection/maintenance).
/// Matched as plain substrings of the cited code.
pub const HIGH_SEVERITY_CODE_FRAGMENTS: &[&str] = &[
    "392.2", "392.4", "392.5", "395.3", "395.8", "393.47", "393.48", "393.75", "396.3",
];

/// Priority of a single violation.
pub fn priority(out_of_service: bool, code: &str) -> Priority {
    if out_of_service {
        return Priority::Critical;
    }
    if HIGH_SEVERITY_CODE_FRAGMENTS
        .iter()
        .any(|fragment| code.contains(fragment))
    {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Priority of a group: the maximum over its members.
///
/// Stops scanning at the first Critical member. An empty group is Medium.
pub fn group_priority<'a, I>(violations: I) -> Priority
where
    I: IntoIterator<Item = &'a Violation>,
{
    let mut highest = Priority::Medium;
    for v in violations {
        let p = priority(v.out_of_service, &v.code);
        if p == Priority::Critical {
            return Priority::Critical;
        }
        highest = highest.max(p);
    }
    highest
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotc_core::{InspectionId, ViolationId};
    use proptest::prelude::*;

    fn violation(code: &str, oos: bool) -> Violation {
        Violation {
            id: ViolationId::new(),
            inspection_id: InspectionId::new(),
            code: code.into(),
            description: String::new(),
            severity: None,
            out_of_service: oos,
            out_of_service_date: None,
            type_tag: None,
            code_lookup: None,
            equipment: None,
        }
    }

    #[test]
    fn out_of_service_is_critical() {
        assert_eq!(priority(true, "393.9"), Priority::Critical);
        assert_eq!(priority(true, ""), Priority::Critical);
    }

    #[test]
    fn known_codes_are_high() {
        assert_eq!(priority(false, "392.2A(1)"), Priority::High);
        assert_eq!(priority(false, "396.3(a)(1)"), Priority::High);
        assert_eq!(priority(false, "395.8(e)"), Priority::High);
        assert_eq!(priority(false, "393.48(a)"), Priority::High);
    }

    #[test]
    fn other_codes_are_medium() {
        assert_eq!(priority(false, "391.1"), Priority::Medium);
        assert_eq!(priority(false, "393.9"), Priority::Medium);
        assert_eq!(priority(false, "390.19"), Priority::Medium);
    }

    #[test]
    fn group_takes_maximum() {
        let group = [violation("391.1", false), violation("392.2", false)];
        assert_eq!(group_priority(&group), Priority::High);

        let group = [
            violation("393.9", false),
            violation("393.9", true),
            violation("396.3", false),
        ];
        assert_eq!(group_priority(&group), Priority::Critical);

        let group = [violation("391.1", false)];
        assert_eq!(group_priority(&group), Priority::Medium);
        assert_eq!(group_priority(std::iter::empty::<&Violation>()), Priority::Medium);
    }

    proptest! {
        #[test]
        fn out_of_service_always_critical(code in ".{0,32}") {
            prop_assert_eq!(priority(true, &code), Priority::Critical);
        }
    }
}
