use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use super::{NodeId, ObjectTree};
use crate::errors::ModelError;
use crate::polyvector::PolyVector;
use crate::property::AbstractProperty;

/// Node level change handler.
///
/// Called synchronously after a property write through the tree committed a
/// change. The handler gets the whole tree and may mutate it, including
/// reparenting or removing the node it observes.
pub type ObserverFn = Rc<dyn Fn(&mut ObjectTree, NodeId, &str)>;

#[derive(Clone)]
pub(crate) struct Observer {
    pub(crate) ident: Option<String>,
    pub(crate) handler: ObserverFn,
}

/// A statically known object class
///
/// `build` declares the properties and observers of a fresh instance. It
/// runs before the instance is linked into a tree.
pub trait ObjectClass: 'static {
    const CLASS_NAME: &'static str;

    /// Names of the classes this class can be cast to.
    const BASES: &'static [&'static str] = &[];

    /// # Errors
    ///
    /// Typically `DuplicateProperty` or a property construction failure.
    fn build(object: &mut Object) -> Result<(), ModelError>;
}

/// Tree node: identity, class, name, properties and observers
///
/// Children and parent links live in the [`ObjectTree`] so that ownership
/// stays with the arena.
pub struct Object {
    uuid: Uuid,
    class_name: String,
    bases: Vec<String>,
    name: String,
    properties: PolyVector<dyn AbstractProperty>,
    dynamic_properties: PolyVector<dyn AbstractProperty>,
    observers: Vec<Observer>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Object {
    /// New instance with a fresh random uuid.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self::with_uuid(class_name, Uuid::new_v4())
    }

    /// New instance with a given identity.
    pub fn with_uuid(class_name: impl Into<String>, uuid: Uuid) -> Self {
        let class_name = class_name.into();
        Self {
            uuid,
            name: class_name.clone(),
            class_name,
            bases: Vec::new(),
            properties: PolyVector::new(),
            dynamic_properties: PolyVector::new(),
            observers: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Instantiate a registered class without a factory.
    ///
    /// # Errors
    ///
    /// Whatever `T::build` reports.
    pub fn of<T: ObjectClass>() -> Result<Self, ModelError> {
        let mut object = Self::new(T::CLASS_NAME).with_bases(T::BASES);
        T::build(&mut object)?;
        Ok(object)
    }

    pub fn with_bases(mut self, bases: &[&str]) -> Self {
        self.bases = bases.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Identity is assigned before the node becomes reachable.
    pub(crate) fn assign_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The factory stamps the registered class onto what a constructor built.
    pub(crate) fn set_class(&mut self, class_name: &str, bases: &[String]) {
        self.class_name = class_name.to_string();
        self.bases = bases.to_vec();
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Whether this object is of class `class_name` or declares it as a base.
    pub fn is_a(&self, class_name: &str) -> bool {
        self.class_name == class_name || self.bases.iter().any(|b| b == class_name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Declare a static property.
    ///
    /// # Errors
    ///
    /// `DuplicateProperty` if the ident is already used.
    pub fn add_property<P: AbstractProperty>(&mut self, property: P) -> Result<(), ModelError> {
        self.ensure_free(property.ident())?;
        self.properties.push_value(property);
        Ok(())
    }

    /// Static properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &(dyn AbstractProperty + 'static)> + '_ {
        self.properties.iter()
    }

    /// Dynamic properties in insertion order.
    pub fn dynamic_properties(&self) -> impl Iterator<Item = &(dyn AbstractProperty + 'static)> + '_ {
        self.dynamic_properties.iter()
    }

    pub fn has_static_property(&self, ident: &str) -> bool {
        self.properties.position(|p| p.ident() == ident).is_some()
    }

    pub fn has_dynamic_property(&self, ident: &str) -> bool {
        self.dynamic_properties.position(|p| p.ident() == ident).is_some()
    }

    /// Static properties first, then dynamic ones.
    pub fn find_property(&self, ident: &str) -> Option<&dyn AbstractProperty> {
        self.properties
            .iter()
            .chain(self.dynamic_properties.iter())
            .find(|p| p.ident() == ident)
    }

    pub fn find_property_mut(
        &mut self,
        ident: &str,
    ) -> Option<&mut (dyn AbstractProperty + 'static)> {
        if let Some(index) = self.properties.position(|p| p.ident() == ident) {
            return self.properties.get_mut(index);
        }
        let index = self.dynamic_properties.position(|p| p.ident() == ident)?;
        self.dynamic_properties.get_mut(index)
    }

    /// Concrete view of a property.
    pub fn property_as<P: AbstractProperty>(&self, ident: &str) -> Option<&P> {
        self.find_property(ident)?.as_any().downcast_ref::<P>()
    }

    /// Add a property at runtime.
    ///
    /// # Errors
    ///
    /// `DuplicateProperty` if the ident is already used.
    pub fn add_dynamic_property(
        &mut self,
        property: Box<dyn AbstractProperty>,
    ) -> Result<(), ModelError> {
        let index = self.dynamic_properties.len();
        self.insert_dynamic_property(index, property)
    }

    /// Add a property at runtime at `index` (clamped to the end).
    ///
    /// # Errors
    ///
    /// `DuplicateProperty` if the ident is already used.
    pub fn insert_dynamic_property(
        &mut self,
        index: usize,
        property: Box<dyn AbstractProperty>,
    ) -> Result<(), ModelError> {
        self.ensure_free(property.ident())?;
        let index = index.min(self.dynamic_properties.len());
        self.dynamic_properties.insert(index, property);
        Ok(())
    }

    /// # Errors
    ///
    /// `PropertyNotFound` if no dynamic property has that ident.
    pub fn remove_dynamic_property(
        &mut self,
        ident: &str,
    ) -> Result<Box<dyn AbstractProperty>, ModelError> {
        self.dynamic_properties
            .position(|p| p.ident() == ident)
            .and_then(|index| self.dynamic_properties.remove(index))
            .ok_or_else(|| ModelError::PropertyNotFound {
                node: self.uuid.braced().to_string(),
                ident: ident.to_string(),
            })
    }

    /// Register a node level observer for one property, or for all of them
    /// when `ident` is `None`.
    pub fn on_property_changed(
        &mut self,
        ident: Option<&str>,
        handler: impl Fn(&mut ObjectTree, NodeId, &str) + 'static,
    ) {
        self.observers.push(Observer {
            ident: ident.map(str::to_string),
            handler: Rc::new(handler),
        });
    }

    /// Handlers interested in `ident`, cloned so they can run while the
    /// tree is mutated.
    pub(crate) fn observers_for(&self, ident: &str) -> Vec<ObserverFn> {
        self.observers
            .iter()
            .filter(|o| o.ident.as_deref().map_or(true, |i| i == ident))
            .map(|o| o.handler.clone())
            .collect()
    }

    fn ensure_free(&self, ident: &str) -> Result<(), ModelError> {
        if self.find_property(ident).is_some() {
            return Err(ModelError::DuplicateProperty {
                node: self.uuid.braced().to_string(),
                ident: ident.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("uuid", &self.uuid)
            .field("class_name", &self.class_name)
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("dynamic_properties", &self.dynamic_properties)
            .field("children", &self.children)
            .finish()
    }
}
