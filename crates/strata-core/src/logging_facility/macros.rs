//! Lifecycle macros for boundary layers
//!
//! A boundary (the CLI, or any host driving undo and sync) wraps each
//! operation in one start event and then exactly one end or end_error
//! event. The core never uses these; it only emits `debug!` details.
//!
//! Callers need `tracing` and `strata-core-types` as direct dependencies.

#[doc(hidden)]
#[macro_export]
macro_rules! __op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        );
    };
}

/// Start of an operation
///
/// ```
/// # use strata_core::log_op_start;
/// log_op_start!("diff");
/// log_op_start!("diff", left = "a.xml", right = "b.xml");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__op_event!(info, $op, strata_core_types::schema::EVENT_START $(, $($field)*)?)
    };
}

/// Successful end of an operation; `duration_ms` comes first
///
/// ```
/// # use strata_core::log_op_end;
/// log_op_end!("patch", duration_ms = 3);
/// log_op_end!("patch", duration_ms = 3, edit_count = 12);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__op_event!(
            info,
            $op,
            strata_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Failed end of an operation
///
/// Takes anything convertible into [`ExError`](crate::errors::ExError) and
/// records its kind, stable code, and the node and property it names.
///
/// ```
/// # use strata_core::log_op_error;
/// # use strata_core::errors::PatchError;
/// let err = PatchError::TargetNotFound { uuid: uuid::Uuid::nil() };
/// log_op_error!("patch", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__op_event!(
            error,
            $op,
            strata_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            node_uuid = ex_err.node_uuid().map(tracing::field::display),
            property = ex_err.property()
            $(, $($field)*)?
        )
    }};
}
