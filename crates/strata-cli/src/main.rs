//! Strata CLI
//!
//! Command-line interface for inspecting, diffing and patching memento files

use clap::{Parser, Subcommand};
use strata_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "Strata - object snapshots, structural diffs and patches", long_about = None)]
struct Cli {
    /// Log profile on stderr: text, json (silent when omitted)
    #[arg(long, global = true)]
    log_format: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a memento file and print its summary
    Check(commands::check::CheckArgs),
    /// Compute the diff between two snapshots of the same object
    Diff(commands::diff::DiffArgs),
    /// Apply a diff file to a memento file
    Patch(commands::patch::PatchArgs),
    /// Invert a diff file (undo)
    Invert(commands::invert::InvertArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Some(profile) = cli.log_format {
        logging_facility::init(profile);
    }

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Patch(args) => commands::patch::execute(args),
        Commands::Invert(args) => commands::invert::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
