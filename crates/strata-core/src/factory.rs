//! Object factory.
//!
//! Maps class names to constructor closures so that mementos and patches can
//! recreate nodes they only know by name. A created node is inserted into the
//! tree and linked to its parent before the caller sees its [`NodeId`], so
//! anything applied afterwards (memento values, patch edits) runs against a
//! node that already has its final parent.

use std::collections::BTreeMap;
use std::rc::Rc;

use uuid::Uuid;

use crate::errors::{FactoryError, ModelError};
use crate::model::{NodeId, Object, ObjectClass, ObjectTree};

type Constructor = Rc<dyn Fn() -> Result<Object, ModelError>>;

struct ClassEntry {
    bases: Vec<String>,
    construct: Constructor,
}

/// Registry of constructible classes
#[derive(Default)]
pub struct ObjectFactory {
    classes: BTreeMap<String, ClassEntry>,
}

impl ObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically known class.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if the class name is taken.
    pub fn register<T: ObjectClass>(&mut self) -> Result<(), FactoryError> {
        self.register_with(T::CLASS_NAME, T::BASES, Object::of::<T>)
    }

    /// Register a class through an explicit constructor.
    ///
    /// The constructor result is stamped with `class_name` and `bases`, so
    /// it only has to declare properties and observers.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if the class name is taken.
    pub fn register_with(
        &mut self,
        class_name: &str,
        bases: &[&str],
        construct: impl Fn() -> Result<Object, ModelError> + 'static,
    ) -> Result<(), FactoryError> {
        if self.classes.contains_key(class_name) {
            return Err(FactoryError::AlreadyRegistered {
                class_name: class_name.to_string(),
            });
        }
        self.classes.insert(
            class_name.to_string(),
            ClassEntry {
                bases: bases.iter().map(|b| b.to_string()).collect(),
                construct: Rc::new(construct),
            },
        );
        Ok(())
    }

    pub fn is_known(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Registered class names in lexical order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.classes.keys().map(String::as_str)
    }

    /// Whether instances of `class_name` can be treated as `target`.
    pub fn can_cast(&self, class_name: &str, target: &str) -> bool {
        if class_name == target {
            return self.is_known(class_name);
        }
        self.classes
            .get(class_name)
            .is_some_and(|entry| entry.bases.iter().any(|b| b == target))
    }

    /// Create a node with a fresh uuid.
    ///
    /// # Errors
    ///
    /// `UnknownType`, `Construction` if the constructor fails, or a model
    /// error if the node cannot be linked to `parent`.
    pub fn create(
        &self,
        class_name: &str,
        tree: &mut ObjectTree,
        parent: Option<NodeId>,
    ) -> Result<NodeId, FactoryError> {
        self.create_with_uuid(class_name, Uuid::new_v4(), tree, parent)
    }

    /// Create a node carrying a given identity.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub fn create_with_uuid(
        &self,
        class_name: &str,
        uuid: Uuid,
        tree: &mut ObjectTree,
        parent: Option<NodeId>,
    ) -> Result<NodeId, FactoryError> {
        let object = self.instantiate(class_name, uuid)?;
        let id = tree.insert(object);
        if let Some(parent) = parent {
            if let Err(e) = tree.append_child(parent, id) {
                // `id` was inserted just above and has no observers yet.
                tree.remove(id).ok();
                return Err(e.into());
            }
        }
        tracing::debug!(class_name, node_uuid = %uuid, node = %id, "created node");
        Ok(id)
    }

    fn instantiate(&self, class_name: &str, uuid: Uuid) -> Result<Object, FactoryError> {
        let entry = self
            .classes
            .get(class_name)
            .ok_or_else(|| FactoryError::UnknownType {
                class_name: class_name.to_string(),
            })?;
        let mut object = (entry.construct)().map_err(|source| FactoryError::Construction {
            class_name: class_name.to_string(),
            source,
        })?;
        let follow_class = object.name() == object.class_name();
        object.set_class(class_name, &entry.bases);
        if follow_class {
            object.set_name(class_name);
        }
        object.assign_uuid(uuid);
        Ok(object)
    }
}

impl std::fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}
