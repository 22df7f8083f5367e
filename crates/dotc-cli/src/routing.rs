//! # Routing CLI — Validate routing-table files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dotc_caf::RoutingTable;

/// Routing subcommand arguments.
#[derive(Args, Debug)]
pub struct RoutingArgs {
    #[command(subcommand)]
    pub command: RoutingCommand,
}

#[derive(Subcommand, Debug)]
pub enum RoutingCommand {
    /// Load a YAML routing table and print the effective keywords.
    Validate {
        /// Path to the routing-table file.
        file: PathBuf,
    },
}

/// Execute the routing subcommand.
pub fn run_routing(args: &RoutingArgs) -> Result<u8> {
    match &args.command {
        RoutingCommand::Validate { file } => run_validate(file),
    }
}

fn run_validate(file: &Path) -> Result<u8> {
    let table = RoutingTable::load(file)
        .with_context(|| format!("invalid routing table {}", file.display()))?;

    println!("OK: {}", file.display());
    println!();
    println!("default:");
    for (category, keywords) in table.defaults() {
        println!("  {:<10} {}", category.as_str(), keywords.join(", "));
    }
    for (org, overrides) in table.overrides() {
        println!("organization {}:", org.as_uuid());
        for (category, keywords) in overrides {
            println!("  {:<10} {}", category.as_str(), keywords.join(", "));
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(contents: &str) -> Result<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.yaml");
        std::fs::write(&path, contents).unwrap();
        run_routing(&RoutingArgs {
            command: RoutingCommand::Validate { file: path },
        })
    }

    #[test]
    fn valid_table_passes() {
        let code = validate("default:\n  driver: [Safety, Dispatch]\n").unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn empty_keyword_list_fails() {
        assert!(validate("default:\n  equipment: [\"  \"]\n").is_err());
    }

    #[test]
    fn missing_file_fails() {
        let err = run_routing(&RoutingArgs {
            command: RoutingCommand::Validate {
                file: PathBuf::from("/nonexistent/routing.yaml"),
            },
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("routing.yaml"));
    }
}
