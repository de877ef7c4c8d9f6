//! Patch command: apply a diff file to a memento file
//!
//! Works on the snapshot text only, so no object classes are needed. The
//! input file is never modified; the patched memento goes to stdout or to
//! `--output`.

use std::path::PathBuf;

use clap::Args;
use strata_core::errors::ExError;
use strata_core::{Memento, MementoDiff};

use super::{read_input, run_op, write_output, CommandResult};

#[derive(Debug, Args)]
pub struct PatchArgs {
    /// Memento to patch
    pub memento: PathBuf,

    /// Diff to apply
    pub diff: PathBuf,

    /// Apply the inverted diff (undo)
    #[arg(long)]
    pub reverse: bool,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: PatchArgs) -> CommandResult {
    run_op("patch", || {
        let memento = Memento::parse(&read_input(&args.memento)?).map_err(ExError::from)?;
        let mut diff = MementoDiff::parse(&read_input(&args.diff)?).map_err(ExError::from)?;
        if args.reverse {
            diff = diff.inverted();
        }

        let patched = diff.patched(&memento).map_err(ExError::from)?;
        tracing::debug!(
            class_name = patched.class_name(),
            node_count = patched.node_count(),
            edit_count = diff.len(),
            "patch applied"
        );
        write_output(args.output.as_ref(), &patched.to_text())
    })
}
