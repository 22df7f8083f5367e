//! # Classify CLI — Category and priority of one violation.

use anyhow::Result;
use clap::Args;
use dotc_caf::classifier::classify_parts;
use dotc_caf::priority;
use dotc_core::{LookupResponsibility, Priority, ResponsibilityCategory};

/// Classify subcommand arguments.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Regulatory code as cited, e.g. `392.2A(1)`.
    pub code: String,

    /// Explicit violation type tag, e.g. `DRIVER_PERFORMANCE`.
    #[arg(long)]
    pub type_tag: Option<String>,

    /// Canonical lookup responsibility (DRIVER, VEHICLE or OTHER).
    #[arg(long, value_parser = parse_lookup)]
    pub lookup: Option<LookupResponsibility>,

    /// The violation placed the vehicle or driver out of service.
    #[arg(long)]
    pub oos: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

fn parse_lookup(raw: &str) -> Result<LookupResponsibility, String> {
    raw.parse().map_err(|e| format!("{e}"))
}

/// Classification of one violation.
#[derive(Debug, PartialEq, Eq)]
pub struct Classification {
    pub category: ResponsibilityCategory,
    pub priority: Priority,
}

pub fn classify_args(args: &ClassifyArgs) -> Classification {
    let lookup = args.lookup.map(|l| l.as_str());
    Classification {
        category: classify_parts(lookup, args.type_tag.as_deref(), &args.code),
        priority: priority(args.oos, args.code.trim()),
    }
}

/// Execute the classify subcommand.
pub fn run_classify(args: &ClassifyArgs) -> Result<u8> {
    let result = classify_args(args);
    if args.json {
        let out = serde_json::json!({
            "code": args.code.trim(),
            "category": result.category,
            "category_label": result.category.label(),
            "priority": result.priority,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("code:     {}", args.code.trim());
        println!("category: {}", result.category.label());
        println!("priority: {}", result.priority.as_str());
    }
    Ok(0)
}
