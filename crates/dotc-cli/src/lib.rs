//! # dotc-cli — Command-Line Tool for Corrective Action Forms
//!
//! Offline access to the CAF engine. Nothing here talks to a database.
//!
//! ## Subcommands
//!
//! - `dotc classify`: Category and priority of a single violation code.
//! - `dotc preview`: Run CAF generation against a JSON fixture.
//! - `dotc routing validate`: Load and check a routing-table file.
//!
//! ```bash
//! dotc classify 393.9 --oos
//! dotc preview fixtures/roadside_inspection.json --json
//! dotc routing validate routing.yaml
//! ```

pub mod classify;
pub mod preview;
pub mod routing;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a file to a string, naming the path in the error.
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
