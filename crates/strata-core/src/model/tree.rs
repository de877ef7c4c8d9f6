use std::collections::HashMap;

use uuid::Uuid;

use super::{Object, ObjectClass};
use crate::errors::{ModelError, PropertyError};
use crate::property::{AbstractProperty, Locale, Value, Variant};

/// Stable handle of a node inside an [`ObjectTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena owning every node of one or more object trees
///
/// Nodes are addressed by [`NodeId`]; parent and child links are ids, so
/// there are no reference cycles. A node is owned by the arena and belongs
/// to at most one parent. Removing a node removes its whole subtree.
#[derive(Debug, Default)]
pub struct ObjectTree {
    nodes: HashMap<NodeId, Object>,
    next_id: u64,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Take ownership of a detached object; it becomes a root.
    pub fn insert(&mut self, mut object: Object) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        object.parent = None;
        object.children.clear();
        self.nodes.insert(id, object);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Object> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Object> {
        self.nodes.get_mut(&id)
    }

    /// # Errors
    ///
    /// `NodeNotFound` if `id` is not in the tree.
    pub fn node(&self, id: NodeId) -> Result<&Object, ModelError> {
        self.nodes.get(&id).ok_or_else(|| not_found(id))
    }

    /// # Errors
    ///
    /// `NodeNotFound` if `id` is not in the tree.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Object, ModelError> {
        self.nodes.get_mut(&id).ok_or_else(|| not_found(id))
    }

    /// Nodes without a parent, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, object)| object.parent.is_none())
            .map(|(id, _)| *id)
            .collect();
        roots.sort();
        roots
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|object| object.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|object| object.children.as_slice())
            .unwrap_or(&[])
    }

    /// `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Reparent `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` or `CycleDetected`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ModelError> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Reparent `child` to `parent` at `index` (clamped to the child count).
    ///
    /// The old link is severed before the new one is made.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` or `CycleDetected`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), ModelError> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ModelError::CycleDetected {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.unlink(child);
        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Move an existing child of `parent` to `index` (clamped).
    ///
    /// # Errors
    ///
    /// `NodeNotFound`, or `NotAChild` if `child` is not below `parent`.
    pub fn move_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), ModelError> {
        let siblings = &mut self.node_mut(parent)?.children;
        let from = siblings
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| ModelError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })?;
        siblings.remove(from);
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        Ok(())
    }

    /// Make `id` a root again.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`.
    pub fn detach(&mut self, id: NodeId) -> Result<(), ModelError> {
        self.node(id)?;
        self.unlink(id);
        Ok(())
    }

    /// Destroy `id` and its whole subtree. Returns the number of removed nodes.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, ModelError> {
        self.node(id)?;
        self.unlink(id);
        let doomed = self.descendants(id);
        for node in &doomed {
            self.nodes.remove(node);
        }
        Ok(doomed.len())
    }

    /// `root` and everything below it, depth first, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(object) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(object.children.iter().rev().copied());
            }
        }
        out
    }

    /// First direct child of class `T` or of a class declaring `T` as base.
    pub fn find_direct_child<T: ObjectClass>(&self, parent: NodeId) -> Option<NodeId> {
        self.find_direct_child_by_class(parent, T::CLASS_NAME)
    }

    pub fn find_direct_child_by_class(&self, parent: NodeId, class_name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|o| o.is_a(class_name)))
    }

    /// Direct child with the given uuid.
    pub fn find_child_by_uuid(&self, parent: NodeId, uuid: &Uuid) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|o| o.uuid() == *uuid))
    }

    /// Node with the given uuid in the subtree of `root` (inclusive).
    pub fn find_by_uuid(&self, root: NodeId, uuid: &Uuid) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.nodes.get(id).is_some_and(|o| o.uuid() == *uuid))
    }

    /// # Errors
    ///
    /// `NodeNotFound`.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), ModelError> {
        self.node_mut(id)?.set_name(name);
        Ok(())
    }

    /// Run `f` on a property of `id`, then dispatch node observers if the
    /// property's revision moved.
    ///
    /// Observers run after `f` returned and see the committed state. They
    /// are taken from a snapshot of the handler list, so they may mutate the
    /// tree freely.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`, `PropertyNotFound`, or the property error from `f`.
    pub fn update_property<R>(
        &mut self,
        id: NodeId,
        ident: &str,
        f: impl FnOnce(&mut dyn AbstractProperty) -> Result<R, PropertyError>,
    ) -> Result<R, ModelError> {
        let object = self.node_mut(id)?;
        let node = object.uuid().braced().to_string();
        let property = object
            .find_property_mut(ident)
            .ok_or_else(|| ModelError::PropertyNotFound {
                node,
                ident: ident.to_string(),
            })?;
        let before = property.revision();
        let result = f(&mut *property)?;
        let changed = property.revision() != before;
        if changed {
            self.dispatch(id, ident);
        }
        Ok(result)
    }

    /// User facing assignment through the tree.
    ///
    /// # Errors
    ///
    /// As [`update_property`](Self::update_property) with
    /// [`AbstractProperty::set`].
    pub fn set_property(&mut self, id: NodeId, ident: &str, value: Value) -> Result<bool, ModelError> {
        self.update_property(id, ident, |p| p.set(value))
    }

    /// # Errors
    ///
    /// As [`update_property`](Self::update_property) with
    /// [`AbstractProperty::set_from_variant`].
    pub fn set_property_variant(
        &mut self,
        id: NodeId,
        ident: &str,
        variant: &Variant,
        locale: &Locale,
    ) -> Result<bool, ModelError> {
        self.update_property(id, ident, |p| p.set_from_variant(variant, locale))
    }

    /// # Errors
    ///
    /// `NodeNotFound` or `PropertyNotFound`.
    pub fn revert_property(&mut self, id: NodeId, ident: &str) -> Result<(), ModelError> {
        self.update_property(id, ident, |p| {
            p.revert();
            Ok(())
        })
    }

    fn dispatch(&mut self, id: NodeId, ident: &str) {
        let handlers = match self.nodes.get(&id) {
            Some(object) => object.observers_for(ident),
            None => return,
        };
        for handler in handlers {
            handler(self, id, ident);
        }
    }

    fn unlink(&mut self, child: NodeId) {
        let old_parent = self.nodes.get_mut(&child).and_then(|o| o.parent.take());
        if let Some(parent) = old_parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != child);
            }
        }
    }
}

fn not_found(id: NodeId) -> ModelError {
    ModelError::NodeNotFound {
        node: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::DoubleProperty;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node(tree: &mut ObjectTree, name: &str) -> NodeId {
        tree.insert(Object::new("Node").with_name(name))
    }

    fn names(tree: &ObjectTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.get(*id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_append_child_reparents() {
        let mut tree = ObjectTree::new();
        let a = node(&mut tree, "a");
        let b = node(&mut tree, "b");
        let c = node(&mut tree, "c");

        tree.append_child(a, c).unwrap();
        tree.append_child(b, c).unwrap();

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[c]);
        assert_eq!(tree.parent(c), Some(b));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut tree = ObjectTree::new();
        let a = node(&mut tree, "a");
        let b = node(&mut tree, "b");
        tree.append_child(a, b).unwrap();

        assert!(matches!(
            tree.append_child(b, a),
            Err(ModelError::CycleDetected { .. })
        ));
        assert!(matches!(
            tree.append_child(a, a),
            Err(ModelError::CycleDetected { .. })
        ));
        assert_eq!(tree.parent(b), Some(a));
    }

    #[test]
    fn test_insert_and_move_keep_order() {
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "root");
        let kids: Vec<NodeId> = ["x", "y", "z"].iter().map(|n| node(&mut tree, n)).collect();
        for kid in &kids {
            tree.append_child(root, *kid).unwrap();
        }
        let w = node(&mut tree, "w");
        tree.insert_child(root, 1, w).unwrap();
        assert_eq!(names(&tree, tree.children(root)), vec!["x", "w", "y", "z"]);

        tree.move_child(root, kids[2], 0).unwrap();
        assert_eq!(names(&tree, tree.children(root)), vec!["z", "x", "w", "y"]);

        tree.move_child(root, kids[2], 99).unwrap();
        assert_eq!(names(&tree, tree.children(root)), vec!["x", "w", "y", "z"]);
    }

    #[test]
    fn test_remove_destroys_subtree() {
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "root");
        let mid = node(&mut tree, "mid");
        let leaf = node(&mut tree, "leaf");
        tree.append_child(root, mid).unwrap();
        tree.append_child(mid, leaf).unwrap();

        assert_eq!(tree.remove(mid), Ok(2));
        assert!(!tree.contains(leaf));
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_observer_may_reparent_the_changed_node() {
        let mut tree = ObjectTree::new();
        let old_parent = node(&mut tree, "old");
        let new_parent = node(&mut tree, "new");

        let mut object = Object::new("Node");
        object.add_property(DoubleProperty::new("x", 0.0)).unwrap();
        object.on_property_changed(Some("x"), move |tree, id, _| {
            tree.append_child(new_parent, id).unwrap();
        });
        let id = tree.insert(object);
        tree.append_child(old_parent, id).unwrap();

        tree.set_property(id, "x", Value::Double(1.0)).unwrap();

        assert_eq!(tree.parent(id), Some(new_parent));
        assert!(tree.children(old_parent).is_empty());
    }

    #[test]
    fn test_observers_only_fire_on_change() {
        let mut tree = ObjectTree::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();

        let mut object = Object::new("Node");
        object.add_property(DoubleProperty::new("x", 0.0)).unwrap();
        object.on_property_changed(None, move |_, _, ident| {
            log.borrow_mut().push(ident.to_string());
        });
        let id = tree.insert(object);

        tree.set_property(id, "x", Value::Double(0.0)).unwrap();
        tree.set_property(id, "x", Value::Double(2.0)).unwrap();
        tree.revert_property(id, "x").unwrap();

        assert_eq!(*calls.borrow(), vec!["x".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_find_helpers() {
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "root");
        let child = tree.insert(Object::new("Special").with_bases(&["Node"]));
        tree.append_child(root, child).unwrap();
        let uuid = tree.get(child).unwrap().uuid();

        assert_eq!(tree.find_direct_child_by_class(root, "Special"), Some(child));
        assert_eq!(tree.find_direct_child_by_class(root, "Node"), Some(child));
        assert_eq!(tree.find_by_uuid(root, &uuid), Some(child));
        assert_eq!(tree.find_child_by_uuid(root, &uuid), Some(child));
        assert_eq!(tree.roots(), vec![root]);
    }

    #[test]
    fn test_missing_property() {
        let mut tree = ObjectTree::new();
        let id = node(&mut tree, "n");
        assert!(matches!(
            tree.set_property(id, "nope", Value::Int(1)),
            Err(ModelError::PropertyNotFound { .. })
        ));
    }
}
