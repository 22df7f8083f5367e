//! # Narrative Generator
//!
//! Builds the title and structured description of a CAF from the violations
//! in its group. Output is a pure function of the input, including order:
//! the same violations in the same order always produce byte-identical text.
//!
//! ## Description Layout
//!
//! ```text
//! <intro line>
//!
//! Violations:
//! 1. <code> - <description>
//!    Severity: <severity>                       (when present)
//!    OUT OF SERVICE ...                         (when applicable)
//!
//! Required Actions:
//! - <category checklist>
//!
//! Equipment Involved:                           (Equipment groups only)
//! - <unit summary>
//!
//! Regulatory Framework:
//! <category-specific CFR framing>
//!
//! Compliance Reminder: <fixed text>
//! ```

use std::fmt::Write as _;

use dotc_core::{EquipmentId, ResponsibilityCategory, Violation};

/// Maximum number of description characters quoted in a single-violation title.
pub const TITLE_EXCERPT_CHARS: usize = 50;

const COMPLIANCE_REMINDER: &str = "Compliance Reminder: Document every corrective step taken, \
attach supporting evidence, and complete this form by the due date. Records must be retained \
and made available for DOT compliance reviews and audits.";

/// Title and description for one CAF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub title: String,
    pub description: String,
}

/// Describe a group of violations sharing a responsibility category.
pub fn describe(category: ResponsibilityCategory, violations: &[Violation]) -> Narrative {
    Narrative {
        title: title(category, violations),
        description: description(category, violations),
    }
}

fn title(category: ResponsibilityCategory, violations: &[Violation]) -> String {
    match violations {
        [single] => {
            let excerpt: String = single
                .description
                .trim()
                .chars()
                .take(TITLE_EXCERPT_CHARS)
                .collect();
            format!(
                "{} - {}: {}...",
                category.label(),
                single.code.trim(),
                excerpt
            )
        }
        many => format!(
            "{} - Multiple Violations ({} issues)",
            category.label(),
            many.len()
        ),
    }
}

fn description(category: ResponsibilityCategory, violations: &[Violation]) -> String {
    let mut out = String::new();

    let noun = if violations.len() == 1 {
        "violation"
    } else {
        "violations"
    };
    let _ = writeln!(
        out,
        "Corrective action is required for the following {} {} cited during a roadside inspection.",
        category.as_str(),
        noun
    );

    out.push_str("\nViolations:\n");
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(out, "{}. {} - {}", i + 1, v.code.trim(), v.description.trim());
        if let Some(severity) = v.severity.as_deref().filter(|s| !s.trim().is_empty()) {
            let _ = writeln!(out, "   Severity: {}", severity.trim());
        }
        if v.out_of_service {
            match v.out_of_service_date {
                Some(date) => {
                    let _ = writeln!(
                        out,
                        "   OUT OF SERVICE (placed {date}): must be corrected before returning to service."
                    );
                }
                None => {
                    out.push_str(
                        "   OUT OF SERVICE: must be corrected before returning to service.\n",
                    );
                }
            }
        }
    }

    out.push_str("\nRequired Actions:\n");
    for action in required_actions(category) {
        let _ = writeln!(out, "- {action}");
    }

    if category == ResponsibilityCategory::Equipment {
        let units = involved_equipment(violations);
        if !units.is_empty() {
            out.push_str("\nEquipment Involved:\n");
            for unit in units {
                let _ = writeln!(out, "- {unit}");
            }
        }
    }

    out.push_str("\nRegulatory Framework:\n");
    out.push_str(regulatory_framework(category));
    out.push('\n');

    out.push('\n');
    out.push_str(COMPLIANCE_REMINDER);
    out
}

fn required_actions(category: ResponsibilityCategory) -> &'static [&'static str] {
    match category {
        ResponsibilityCategory::Driver => &[
            "Review the cited violation(s) with the driver and document the discussion.",
            "Verify the driver qualification file (license, medical certificate, MVR) is current.",
            "Assign remedial training that addresses the cited conduct and record completion.",
            "Monitor subsequent inspections and hours-of-service records for recurrence.",
        ],
        ResponsibilityCategory::Equipment => &[
            "Repair or replace the defective component(s) before the unit is dispatched.",
            "Complete a repair work order signed by the qualified mechanic who performed the work.",
            "Update the unit's inspection, repair, and maintenance file.",
            "Review pre-trip and post-trip inspection procedures with the assigned driver(s).",
        ],
        ResponsibilityCategory::Company => &[
            "Identify the root cause of the carrier-level deficiency.",
            "Update the affected company policy or procedure.",
            "Communicate the change to affected staff and drivers and record acknowledgement.",
            "Schedule a follow-up compliance review to confirm the correction is effective.",
        ],
    }
}

fn regulatory_framework(category: ResponsibilityCategory) -> &'static str {
    match category {
        ResponsibilityCategory::Driver => {
            "Driver qualification and conduct are governed by 49 CFR Part 391 (Qualifications of \
Drivers), Part 392 (Driving of Commercial Motor Vehicles) and Part 395 (Hours of Service). \
Violations count against the carrier's Unsafe Driving, HOS Compliance and Driver Fitness \
BASICs."
        }
        ResponsibilityCategory::Equipment => {
            "Vehicle condition is governed by 49 CFR Part 393 (Parts and Accessories Necessary for \
Safe Operation) and Part 396 (Inspection, Repair, and Maintenance). Violations count against \
the carrier's Vehicle Maintenance BASIC."
        }
        ResponsibilityCategory::Company => {
            "Carrier obligations are governed by 49 CFR Part 390 (Federal Motor Carrier Safety \
Regulations: General). Unresolved deficiencies can affect the carrier's safety rating during a \
compliance review."
        }
    }
}

/// Equipment summaries, de-duplicated by unit and in order of first appearance.
fn involved_equipment(violations: &[Violation]) -> Vec<String> {
    let mut seen: Vec<EquipmentId> = Vec::new();
    let mut out = Vec::new();
    for eq in violations.iter().filter_map(|v| v.equipment.as_ref()) {
        if seen.contains(&eq.id) {
            continue;
        }
        seen.push(eq.id);
        out.push(eq.summary());
    }
    out
}
