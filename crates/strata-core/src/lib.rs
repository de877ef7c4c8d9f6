//! Strata Core - object/property data model with snapshots and structural diffs
//!
//! This crate provides:
//! - Typed properties (scalar, enum, struct) with read-only, optional and
//!   monitoring flags, change notification and revert-to-default
//! - Object nodes owned by an arena tree with uuid identity and node level
//!   observers
//! - An object factory that recreates nodes by class name
//! - Mementos: structural snapshots with a canonical text form, hashing,
//!   restore and merge
//! - Memento diffs: ordered edit lists, applied to mementos or live trees,
//!   invertible for undo
//! - `PolyVector`, a heterogeneous owning container
//!
//! The model is single threaded. Handlers are `Rc` closures, so trees are
//! neither `Send` nor `Sync`.

pub mod diff;
pub mod errors;
pub mod factory;
pub mod logging_facility;
pub mod memento;
pub mod model;
pub mod polyvector;
pub mod property;

mod text;

// Re-export commonly used types
pub use diff::{DiffEdit, MementoDiff, PropertyScope};
pub use errors::{ExError, ExErrorKind};
pub use factory::ObjectFactory;
pub use memento::{Memento, PropertyEntry, RestoreOptions};
pub use model::{NodeId, Object, ObjectClass, ObjectTree};
pub use polyvector::PolyVector;
pub use property::{AbstractProperty, Locale, PropertyKind, Value, Variant};
