//! Core types shared across Strata facilities
//!
//! This crate provides the foundational types used by the error and logging
//! facilities of `strata-core` and by the command-line boundary:
//!
//! - **Correlation**: `InvocationId` tying the log events of one command together
//! - **Schema constants**: canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::InvocationId;
