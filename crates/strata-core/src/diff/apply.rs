use uuid::Uuid;

use super::{DiffEdit, MementoDiff, PropertyScope};
use crate::errors::{ModelError, PatchError, PropertyError};
use crate::factory::ObjectFactory;
use crate::memento::{Memento, PropertyEntry};
use crate::model::{NodeId, ObjectTree};
use crate::property::property_from_entry;

impl MementoDiff {
    /// Apply every edit to `root` in recorded order.
    ///
    /// # Errors
    ///
    /// The first failing edit stops the run; earlier edits stay applied.
    pub fn apply_to_memento(&self, root: &mut Memento) -> Result<(), PatchError> {
        for edit in &self.edits {
            apply_memento_edit(root, edit)?;
        }
        Ok(())
    }

    /// Patched copy of `memento`.
    ///
    /// # Errors
    ///
    /// As [`apply_to_memento`](Self::apply_to_memento).
    pub fn patched(&self, memento: &Memento) -> Result<Memento, PatchError> {
        let mut copy = memento.clone();
        self.apply_to_memento(&mut copy)?;
        Ok(copy)
    }

    /// Apply every edit to the live subtree at `root`, in recorded order.
    ///
    /// Inserted subtrees are restored through `factory`. Not atomic: when an
    /// edit fails, the edits before it remain applied. See
    /// [`apply_to_tree_atomic`](Self::apply_to_tree_atomic).
    ///
    /// # Errors
    ///
    /// `TargetNotFound`, `PropertyNotFound`, `TypeConflict`,
    /// `MalformedProperty`, `AlreadyExists`, `UnsupportedEdit` (static
    /// property add or remove), or a restore error from an insert.
    pub fn apply_to_tree(
        &self,
        tree: &mut ObjectTree,
        root: NodeId,
        factory: &ObjectFactory,
    ) -> Result<(), PatchError> {
        for edit in &self.edits {
            apply_tree_edit(tree, root, factory, edit)?;
        }
        tracing::debug!(edit_count = self.len(), "patch applied");
        Ok(())
    }

    /// [`apply_to_tree`](Self::apply_to_tree), restoring the captured state
    /// of `root` when an edit fails.
    ///
    /// Nodes re-created by the rollback keep their uuids but get new ids.
    ///
    /// # Errors
    ///
    /// The original edit error after a successful rollback, or
    /// `RollbackFailed` carrying both messages.
    pub fn apply_to_tree_atomic(
        &self,
        tree: &mut ObjectTree,
        root: NodeId,
        factory: &ObjectFactory,
    ) -> Result<(), PatchError> {
        let snapshot = Memento::capture(tree, root)?;
        let cause = match self.apply_to_tree(tree, root, factory) {
            Ok(()) => return Ok(()),
            Err(cause) => cause,
        };
        match snapshot.merge_into(factory, tree, root) {
            Ok(()) => Err(cause),
            Err(rollback) => Err(PatchError::RollbackFailed {
                cause: cause.to_string(),
                rollback: rollback.to_string(),
            }),
        }
    }
}

fn apply_memento_edit(root: &mut Memento, edit: &DiffEdit) -> Result<(), PatchError> {
    let uuid = edit.target();
    let node = root
        .find_mut(&uuid)
        .ok_or(PatchError::TargetNotFound { uuid })?;

    match edit {
        DiffEdit::ChangeValue { ident, new, .. } => {
            let entry = node
                .properties
                .iter_mut()
                .chain(node.dynamic_properties.iter_mut())
                .find(|e| e.ident == *ident)
                .ok_or_else(|| PatchError::PropertyNotFound {
                    uuid,
                    ident: ident.clone(),
                })?;
            if entry.kind != new.kind {
                return Err(PatchError::TypeConflict {
                    uuid,
                    ident: ident.clone(),
                    expected: entry.kind.to_string(),
                    found: new.kind.to_string(),
                });
            }
            *entry = new.clone();
        }
        DiffEdit::InsertChild { index, subtree, .. } => {
            if node.children.iter().any(|c| c.uuid == subtree.uuid) {
                return Err(PatchError::AlreadyExists {
                    uuid,
                    what: format!("child {}", subtree.uuid.braced()),
                });
            }
            let index = (*index).min(node.children.len());
            node.children.insert(index, subtree.clone());
        }
        DiffEdit::RemoveChild { subtree, .. } => {
            let position = child_position(node, &subtree.uuid)?;
            node.children.remove(position);
        }
        DiffEdit::MoveChild { uuid: child, to, .. } => {
            let position = child_position(node, child)?;
            let moved = node.children.remove(position);
            let to = (*to).min(node.children.len());
            node.children.insert(to, moved);
        }
        DiffEdit::AddProperty {
            scope, index, entry, ..
        } => {
            if node.property(&entry.ident).is_some() {
                return Err(PatchError::AlreadyExists {
                    uuid,
                    what: format!("property '{}'", entry.ident),
                });
            }
            let list = entries_mut(node, *scope);
            let index = (*index).min(list.len());
            list.insert(index, entry.clone());
        }
        DiffEdit::RemoveProperty { scope, entry, .. } => {
            let list = entries_mut(node, *scope);
            let position = list
                .iter()
                .position(|e| e.ident == entry.ident)
                .ok_or_else(|| PatchError::PropertyNotFound {
                    uuid,
                    ident: entry.ident.clone(),
                })?;
            list.remove(position);
        }
        DiffEdit::Rename { new, .. } => node.name = new.clone(),
    }
    Ok(())
}

fn child_position(node: &Memento, child: &Uuid) -> Result<usize, PatchError> {
    node.children
        .iter()
        .position(|c| c.uuid == *child)
        .ok_or(PatchError::TargetNotFound { uuid: *child })
}

fn entries_mut(node: &mut Memento, scope: PropertyScope) -> &mut Vec<PropertyEntry> {
    match scope {
        PropertyScope::Static => &mut node.properties,
        PropertyScope::Dynamic => &mut node.dynamic_properties,
    }
}

fn apply_tree_edit(
    tree: &mut ObjectTree,
    root: NodeId,
    factory: &ObjectFactory,
    edit: &DiffEdit,
) -> Result<(), PatchError> {
    let uuid = edit.target();
    let node = tree
        .find_by_uuid(root, &uuid)
        .ok_or(PatchError::TargetNotFound { uuid })?;

    match edit {
        DiffEdit::ChangeValue { ident, new, .. } => {
            tree.update_property(node, ident, |p| p.apply_entry(new))
                .map_err(|e| property_failure(uuid, ident, e))?;
        }
        DiffEdit::InsertChild { index, subtree, .. } => {
            if tree.find_child_by_uuid(node, &subtree.uuid).is_some() {
                return Err(PatchError::AlreadyExists {
                    uuid,
                    what: format!("child {}", subtree.uuid.braced()),
                });
            }
            let child = subtree.restore(factory, tree, Some(node))?;
            tree.move_child(node, child, *index)?;
        }
        DiffEdit::RemoveChild { subtree, .. } => {
            let child = tree
                .find_child_by_uuid(node, &subtree.uuid)
                .ok_or(PatchError::TargetNotFound {
                    uuid: subtree.uuid,
                })?;
            tree.remove(child)?;
        }
        DiffEdit::MoveChild { uuid: child, to, .. } => {
            let child = tree
                .find_child_by_uuid(node, child)
                .ok_or(PatchError::TargetNotFound { uuid: *child })?;
            tree.move_child(node, child, *to)?;
        }
        DiffEdit::AddProperty {
            scope: PropertyScope::Static,
            ..
        }
        | DiffEdit::RemoveProperty {
            scope: PropertyScope::Static,
            ..
        } => {
            return Err(PatchError::UnsupportedEdit {
                uuid,
                reason: "static properties are declared by the class".to_string(),
            });
        }
        DiffEdit::AddProperty { index, entry, .. } => {
            let object = tree.node_mut(node)?;
            if object.find_property(&entry.ident).is_some() {
                return Err(PatchError::AlreadyExists {
                    uuid,
                    what: format!("property '{}'", entry.ident),
                });
            }
            let property = property_from_entry(entry).map_err(|e| PatchError::MalformedProperty {
                uuid,
                ident: entry.ident.clone(),
                reason: e.to_string(),
            })?;
            object.insert_dynamic_property(*index, property)?;
        }
        DiffEdit::RemoveProperty { entry, .. } => {
            tree.node_mut(node)?
                .remove_dynamic_property(&entry.ident)
                .map_err(|e| property_failure(uuid, &entry.ident, e))?;
        }
        DiffEdit::Rename { new, .. } => tree.rename(node, new.as_str())?,
    }
    Ok(())
}

fn property_failure(uuid: Uuid, ident: &str, err: ModelError) -> PatchError {
    match err {
        ModelError::PropertyNotFound { .. } => PatchError::PropertyNotFound {
            uuid,
            ident: ident.to_string(),
        },
        ModelError::Property(PropertyError::TypeMismatch {
            expected, found, ..
        }) => PatchError::TypeConflict {
            uuid,
            ident: ident.to_string(),
            expected: expected.to_string(),
            found,
        },
        ModelError::Property(inner) => PatchError::MalformedProperty {
            uuid,
            ident: ident.to_string(),
            reason: inner.to_string(),
        },
        other => other.into(),
    }
}
