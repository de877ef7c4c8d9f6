//! Invert command

use std::path::PathBuf;

use clap::Args;
use strata_core::errors::ExError;
use strata_core::MementoDiff;

use super::{read_input, run_op, write_output, CommandResult};

#[derive(Debug, Args)]
pub struct InvertArgs {
    /// Diff to invert
    pub diff: PathBuf,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: InvertArgs) -> CommandResult {
    run_op("invert", || {
        let diff = MementoDiff::parse(&read_input(&args.diff)?).map_err(ExError::from)?;
        write_output(args.output.as_ref(), &diff.inverted().to_text())
    })
}
