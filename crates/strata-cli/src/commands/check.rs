//! Check command: parse a memento file and summarize it

use std::path::PathBuf;

use clap::Args;
use strata_core::errors::ExError;
use strata_core::Memento;

use super::{read_input, run_op, to_json, write_output, CommandResult};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Memento file
    pub file: PathBuf,

    /// Print the canonical text form instead of the summary
    #[arg(long, conflicts_with = "json")]
    pub canonical: bool,

    /// Print the memento as JSON
    #[arg(long)]
    pub json: bool,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: CheckArgs) -> CommandResult {
    run_op("check", || {
        let memento = Memento::parse(&read_input(&args.file)?).map_err(ExError::from)?;
        tracing::debug!(
            class_name = memento.class_name(),
            node_count = memento.node_count(),
            "memento parsed"
        );

        let text = if args.canonical {
            memento.to_text()
        } else if args.json {
            to_json(&memento)?
        } else {
            summary(&memento)
        };
        write_output(args.output.as_ref(), &text)
    })
}

fn summary(memento: &Memento) -> String {
    format!(
        "class: {}\nuuid: {}\nname: {}\nnodes: {}\nhash: {}\n",
        memento.class_name(),
        memento.uuid().braced(),
        memento.name(),
        memento.node_count(),
        memento.full_hash()
    )
}
