//! # Violation Classifier
//!
//! Maps a violation to the [`ResponsibilityCategory`] that owns fixing it.
//!
//! Three overlapping sources describe responsibility upstream. They are
//! consulted in a fixed order and the first one that yields an answer wins:
//!
//! 1. The canonical lookup table's responsibility type
//!    (`DRIVER` → Driver, `VEHICLE` → Equipment, `OTHER` → Company).
//! 2. The violation's own explicit type tag.
//! 3. The regulatory code prefix: 391/392 → Driver, 393/396 → Equipment,
//!    390 → Company.
//!
//! Anything still unrecognised is attributed to the Company. Classification
//! never fails.

use dotc_core::{LookupResponsibility, ResponsibilityCategory, Violation, ViolationTypeTag};

/// Classify a violation. Total: every input yields exactly one category.
pub fn classify(violation: &Violation) -> ResponsibilityCategory {
    let lookup = violation
        .code_lookup
        .as_ref()
        .and_then(|l| l.responsibility.as_deref());
    let category = classify_parts(lookup, violation.type_tag.as_deref(), &violation.code);
    tracing::debug!(
        violation_id = %violation.id,
        code = %violation.code,
        category = %category,
        "classified violation"
    );
    category
}

/// Classify from the raw sources, without a full [`Violation`] record.
pub fn classify_parts(
    lookup_responsibility: Option<&str>,
    type_tag: Option<&str>,
    code: &str,
) -> ResponsibilityCategory {
    if let Some(lookup) = lookup_responsibility.and_then(|s| s.parse::<LookupResponsibility>().ok())
    {
        return match lookup {
            LookupResponsibility::Driver => ResponsibilityCategory::Driver,
            LookupResponsibility::Vehicle => ResponsibilityCategory::Equipment,
            LookupResponsibility::Other => ResponsibilityCategory::Company,
        };
    }

    if let Some(tag) = type_tag.and_then(ViolationTypeTag::parse_lenient) {
        return tag.category();
    }

    category_from_code(code)
}

/// Code-prefix heuristic. Unknown prefixes fall back to Company.
pub fn category_from_code(code: &str) -> ResponsibilityCategory {
    let code = code.trim();
    if code.starts_with("391") || code.starts_with("392") {
        ResponsibilityCategory::Driver
    } else if code.starts_with("393") || code.starts_with("396") {
        ResponsibilityCategory::Equipment
    } else {
        // 390 and anything unrecognised.
        ResponsibilityCategory::Company
    }
}
