use uuid::Uuid;

use super::{Memento, PropertyEntry};
use crate::diff::MementoDiff;
use crate::errors::{FactoryError, ModelError, PatchError, RestoreError};
use crate::factory::ObjectFactory;
use crate::model::{NodeId, ObjectTree};
use crate::property::property_from_entry;

/// Restore tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Give every restored node a new random uuid (copy and paste).
    pub fresh_uuids: bool,
}

impl Memento {
    /// Rebuild the subtree through `factory` below `parent`.
    ///
    /// Each node is created with its stored uuid and linked to its parent
    /// before its stored values are applied.
    ///
    /// # Errors
    ///
    /// `UnknownType` or `MalformedProperty`. On error every node this call
    /// created is removed again.
    pub fn restore(
        &self,
        factory: &ObjectFactory,
        tree: &mut ObjectTree,
        parent: Option<NodeId>,
    ) -> Result<NodeId, RestoreError> {
        self.restore_with(factory, tree, parent, RestoreOptions::default())
    }

    /// [`restore`](Self::restore) with options.
    ///
    /// # Errors
    ///
    /// As [`restore`](Self::restore).
    pub fn restore_with(
        &self,
        factory: &ObjectFactory,
        tree: &mut ObjectTree,
        parent: Option<NodeId>,
        options: RestoreOptions,
    ) -> Result<NodeId, RestoreError> {
        let mut root = None;
        match self.build(factory, tree, parent, options, &mut root) {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(root) = root {
                    // Only fails if an observer already removed the root.
                    tree.remove(root).ok();
                }
                Err(e)
            }
        }
    }

    /// Whether every class in the subtree is known to `factory`.
    pub fn is_restorable(&self, factory: &ObjectFactory) -> bool {
        factory.is_known(&self.class_name) && self.children.iter().all(|c| c.is_restorable(factory))
    }

    /// Bring the live subtree at `node` to this memento's state by diffing
    /// against a fresh capture and patching the difference.
    ///
    /// # Errors
    ///
    /// `Diff(IdentityMismatch)` if `node` is a different object, otherwise
    /// as [`MementoDiff::apply_to_tree`].
    pub fn merge_into(
        &self,
        factory: &ObjectFactory,
        tree: &mut ObjectTree,
        node: NodeId,
    ) -> Result<(), PatchError> {
        let current = Memento::capture(tree, node)?;
        let diff = MementoDiff::between(&current, self)?;
        diff.apply_to_tree(tree, node, factory)
    }

    fn build(
        &self,
        factory: &ObjectFactory,
        tree: &mut ObjectTree,
        parent: Option<NodeId>,
        options: RestoreOptions,
        root: &mut Option<NodeId>,
    ) -> Result<NodeId, RestoreError> {
        let uuid = if options.fresh_uuids {
            Uuid::new_v4()
        } else {
            self.uuid
        };
        let id = factory
            .create_with_uuid(&self.class_name, uuid, tree, parent)
            .map_err(|e| match e {
                FactoryError::UnknownType { class_name } => RestoreError::UnknownType {
                    class_name,
                    uuid: self.uuid,
                },
                other => other.into(),
            })?;
        root.get_or_insert(id);

        self.apply_state(tree, id)?;
        for child in &self.children {
            child.build(factory, tree, Some(id), options, root)?;
        }
        Ok(id)
    }

    fn apply_state(&self, tree: &mut ObjectTree, id: NodeId) -> Result<(), RestoreError> {
        tree.rename(id, self.name.as_str())?;

        for entry in &self.properties {
            let declared = tree.node(id)?.has_static_property(&entry.ident);
            if !declared {
                tracing::debug!(
                    class_name = %self.class_name,
                    property = %entry.ident,
                    "skipping unknown static property"
                );
                continue;
            }
            self.apply_entry(tree, id, entry)?;
        }

        for entry in &self.dynamic_properties {
            if tree.node(id)?.find_property(&entry.ident).is_some() {
                self.apply_entry(tree, id, entry)?;
                continue;
            }
            let property = property_from_entry(entry).map_err(|e| self.malformed(entry, e))?;
            tree.node_mut(id)?.add_dynamic_property(property)?;
        }
        Ok(())
    }

    fn apply_entry(
        &self,
        tree: &mut ObjectTree,
        id: NodeId,
        entry: &PropertyEntry,
    ) -> Result<(), RestoreError> {
        tree.update_property(id, &entry.ident, |p| p.apply_entry(entry))
            .map(|_| ())
            .map_err(|e| match e {
                ModelError::Property(inner) => self.malformed(entry, inner),
                other => other.into(),
            })
    }

    fn malformed(&self, entry: &PropertyEntry, reason: impl ToString) -> RestoreError {
        RestoreError::MalformedProperty {
            uuid: self.uuid,
            ident: entry.ident.clone(),
            reason: reason.to_string(),
        }
    }
}
