//! Structured logging facility for Strata
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Lifecycle macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) for
//!   boundary layers such as the CLI
//! - Test capture mode for deterministic assertions
//!
//! The object model itself only emits `tracing::debug!` events for internal
//! details and reports failures as returned errors.
//!
//! # Usage
//!
//! ```rust
//! use strata_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
