//! Subcommands and the helpers they share
//!
//! Every command runs as one logged operation: a start event, then exactly
//! one end or end_error event carrying the duration and invocation id.

pub mod check;
pub mod diff;
pub mod invert;
pub mod patch;

use std::path::{Path, PathBuf};
use std::time::Instant;

use strata_core::errors::{ExError, ExErrorKind};
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_core_types::InvocationId;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Run `body` between the lifecycle events of `op`.
pub fn run_op(op: &'static str, body: impl FnOnce() -> Result<(), ExError>) -> CommandResult {
    let invocation_id = InvocationId::new();
    let start = Instant::now();
    log_op_start!(op, invocation_id = %invocation_id);

    match body() {
        Ok(()) => {
            log_op_end!(
                op,
                duration_ms = elapsed_ms(start),
                invocation_id = %invocation_id
            );
            Ok(())
        }
        Err(err) => {
            let err = err.with_op(op).with_invocation_id(invocation_id.clone());
            log_op_error!(
                op,
                err.clone(),
                duration_ms = elapsed_ms(start),
                invocation_id = %invocation_id
            );
            Err(Box::new(err))
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Read a whole input file.
pub fn read_input(path: &Path) -> Result<String, ExError> {
    std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))
}

/// Write `text` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&PathBuf>, text: &str) -> Result<(), ExError> {
    match output {
        Some(path) => std::fs::write(path, text).map_err(|e| io_error("write", path, e)),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io).with_message(format!("cannot {} {}: {}", action, path.display(), err))
}

/// JSON rendering for `--json` outputs.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ExError> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| ExError::new(ExErrorKind::Internal).with_message(e.to_string()))
}
