//! Structural diff between two mementos of the same object.
//!
//! ## Entry points
//!
//! ```ignore
//! let diff = MementoDiff::between(&before, &after)?;
//! diff.apply_to_tree(&mut tree, root, &factory)?;
//! let undo = diff.inverted();
//! ```
//!
//! ## Guarantees
//!
//! - **Inverse**: `diff(A, B)` applied to a copy of `A` yields `B`.
//! - **Empty on identity**: `diff(A, A)` has no edits.
//! - **Identity matching**: children are matched by uuid only, never by
//!   position or name.
//! - **Ordered**: edits run in recorded order; edits on different nodes
//!   commute.

mod apply;
mod codec;
mod engine;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memento::{Memento, PropertyEntry};

/// Which property list of a node an edit addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyScope {
    Static,
    Dynamic,
}

impl PropertyScope {
    pub fn tag(&self) -> &'static str {
        match self {
            PropertyScope::Static => "static",
            PropertyScope::Dynamic => "dynamic",
        }
    }
}

/// A single structural edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DiffEdit {
    /// Value or flags of an existing property changed
    ChangeValue {
        uuid: Uuid,
        ident: String,
        old: PropertyEntry,
        new: PropertyEntry,
    },
    InsertChild {
        parent: Uuid,
        index: usize,
        subtree: Memento,
    },
    RemoveChild {
        parent: Uuid,
        index: usize,
        subtree: Memento,
    },
    MoveChild {
        parent: Uuid,
        uuid: Uuid,
        from: usize,
        to: usize,
    },
    AddProperty {
        uuid: Uuid,
        scope: PropertyScope,
        index: usize,
        entry: PropertyEntry,
    },
    RemoveProperty {
        uuid: Uuid,
        scope: PropertyScope,
        index: usize,
        entry: PropertyEntry,
    },
    Rename {
        uuid: Uuid,
        old: String,
        new: String,
    },
}

impl DiffEdit {
    /// Node the edit addresses (the parent for child edits).
    pub fn target(&self) -> Uuid {
        match self {
            DiffEdit::ChangeValue { uuid, .. }
            | DiffEdit::AddProperty { uuid, .. }
            | DiffEdit::RemoveProperty { uuid, .. }
            | DiffEdit::Rename { uuid, .. } => *uuid,
            DiffEdit::InsertChild { parent, .. }
            | DiffEdit::RemoveChild { parent, .. }
            | DiffEdit::MoveChild { parent, .. } => *parent,
        }
    }

    /// The edit that undoes this one.
    pub fn inverted(&self) -> DiffEdit {
        match self.clone() {
            DiffEdit::ChangeValue {
                uuid,
                ident,
                old,
                new,
            } => DiffEdit::ChangeValue {
                uuid,
                ident,
                old: new,
                new: old,
            },
            DiffEdit::InsertChild {
                parent,
                index,
                subtree,
            } => DiffEdit::RemoveChild {
                parent,
                index,
                subtree,
            },
            DiffEdit::RemoveChild {
                parent,
                index,
                subtree,
            } => DiffEdit::InsertChild {
                parent,
                index,
                subtree,
            },
            DiffEdit::MoveChild {
                parent,
                uuid,
                from,
                to,
            } => DiffEdit::MoveChild {
                parent,
                uuid,
                from: to,
                to: from,
            },
            DiffEdit::AddProperty {
                uuid,
                scope,
                index,
                entry,
            } => DiffEdit::RemoveProperty {
                uuid,
                scope,
                index,
                entry,
            },
            DiffEdit::RemoveProperty {
                uuid,
                scope,
                index,
                entry,
            } => DiffEdit::AddProperty {
                uuid,
                scope,
                index,
                entry,
            },
            DiffEdit::Rename { uuid, old, new } => DiffEdit::Rename {
                uuid,
                old: new,
                new: old,
            },
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DiffEdit::InsertChild { .. } | DiffEdit::RemoveChild { .. } | DiffEdit::MoveChild { .. }
        )
    }
}

/// Ordered edit list between two mementos sharing a root identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MementoDiff {
    edits: Vec<DiffEdit>,
}

impl MementoDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edits(edits: Vec<DiffEdit>) -> Self {
        Self { edits }
    }

    pub fn edits(&self) -> &[DiffEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn push(&mut self, edit: DiffEdit) {
        self.edits.push(edit);
    }

    /// Run `other` after this diff.
    pub fn append(&mut self, other: &MementoDiff) {
        self.edits.extend(other.edits.iter().cloned());
    }

    /// Diff that undoes this one: edits inverted, in reverse order.
    pub fn inverted(&self) -> MementoDiff {
        MementoDiff {
            edits: self.edits.iter().rev().map(DiffEdit::inverted).collect(),
        }
    }

    /// Whether any child is inserted, removed or moved.
    pub fn has_object_tree_changes(&self) -> bool {
        self.edits.iter().any(DiffEdit::is_structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKind;

    fn rename(old: &str, new: &str) -> DiffEdit {
        DiffEdit::Rename {
            uuid: Uuid::nil(),
            old: old.to_string(),
            new: new.to_string(),
        }
    }

    #[test]
    fn test_inverted_reverses_and_swaps() {
        let diff = MementoDiff::from_edits(vec![
            rename("a", "b"),
            DiffEdit::AddProperty {
                uuid: Uuid::nil(),
                scope: PropertyScope::Dynamic,
                index: 0,
                entry: PropertyEntry::new("n", PropertyKind::Int, "1"),
            },
        ]);

        let undo = diff.inverted();

        assert!(matches!(undo.edits()[0], DiffEdit::RemoveProperty { index: 0, .. }));
        assert_eq!(undo.edits()[1], rename("b", "a"));
        assert_eq!(undo.inverted(), diff);
    }

    #[test]
    fn test_append_and_structure_flag() {
        let mut diff = MementoDiff::from_edits(vec![rename("a", "b")]);
        assert!(!diff.has_object_tree_changes());

        diff.append(&MementoDiff::from_edits(vec![DiffEdit::MoveChild {
            parent: Uuid::nil(),
            uuid: Uuid::nil(),
            from: 0,
            to: 1,
        }]));

        assert_eq!(diff.len(), 2);
        assert!(diff.has_object_tree_changes());
    }
}
