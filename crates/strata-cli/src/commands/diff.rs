//! Diff command: edits between two snapshots of the same object

use std::path::PathBuf;

use clap::Args;
use strata_core::errors::ExError;
use strata_core::{Memento, MementoDiff};

use super::{read_input, run_op, to_json, write_output, CommandResult};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Snapshot before the change
    pub old: PathBuf,

    /// Snapshot after the change
    pub new: PathBuf,

    /// Print the edit list as JSON instead of the diff text form
    #[arg(long)]
    pub json: bool,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: DiffArgs) -> CommandResult {
    run_op("diff", || {
        let old = Memento::parse(&read_input(&args.old)?).map_err(ExError::from)?;
        let new = Memento::parse(&read_input(&args.new)?).map_err(ExError::from)?;
        let diff = MementoDiff::between(&old, &new).map_err(ExError::from)?;
        tracing::debug!(
            class_name = old.class_name(),
            node_count = new.node_count(),
            edit_count = diff.len(),
            "diff computed"
        );

        let text = if args.json {
            to_json(&diff)?
        } else {
            diff.to_text()
        };
        write_output(args.output.as_ref(), &text)
    })
}
