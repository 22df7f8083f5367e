//! # dotc CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dotc_cli::classify::{run_classify, ClassifyArgs};
use dotc_cli::preview::{run_preview, PreviewArgs};
use dotc_cli::routing::{run_routing, RoutingArgs};

/// DOT compliance toolchain for corrective action forms.
///
/// Classifies violations, previews CAF generation offline, and validates
/// routing-table files.
#[derive(Parser, Debug)]
#[command(name = "dotc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the category and priority of a violation code.
    Classify(ClassifyArgs),

    /// Generate CAFs from a JSON fixture without a database.
    Preview(PreviewArgs),

    /// Routing-table operations.
    Routing(RoutingArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let json = std::env::var("DOTC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Classify(args) => run_classify(&args),
        Commands::Preview(args) => run_preview(&args),
        Commands::Routing(args) => run_routing(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
