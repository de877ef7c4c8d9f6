//! Object nodes and the arena that owns them.

mod object;
mod tree;

pub use object::{Object, ObjectClass, ObserverFn};
pub use tree::{NodeId, ObjectTree};
