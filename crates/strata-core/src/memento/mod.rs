//! Structural snapshots of object subtrees.
//!
//! A [`Memento`] is a plain value: it holds no references into the live
//! tree it was captured from and can be stored, hashed, compared, diffed and
//! later restored through an [`ObjectFactory`](crate::factory::ObjectFactory).
//!
//! ## Text form
//!
//! ```text
//! <object uuid="{…}" class="Wing" name="left">
//!   <property name="span" type="double">12.5</property>
//!   <dynamicproperties>
//!     <property name="note" type="string">draft</property>
//!   </dynamicproperties>
//!   <objectlist>
//!     <object uuid="{…}" class="Flap" name="Flap"/>
//!   </objectlist>
//! </object>
//! ```

mod codec;
mod restore;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{ModelError, ParseError};
use crate::model::{NodeId, ObjectTree};
use crate::property::PropertyKind;

pub(crate) use codec::{read_entry, read_memento, write_entry, write_memento};
pub use restore::RestoreOptions;

/// Snapshot of one property: value text, flags, and nested members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub ident: String,
    pub kind: PropertyKind,
    /// Canonical C-locale text; empty for structs
    pub value: String,
    pub optional: bool,
    pub active: bool,
    /// Allowed values of an enum property
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Member entries of a struct property
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<PropertyEntry>,
}

impl PropertyEntry {
    pub fn new(ident: impl Into<String>, kind: PropertyKind, value: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            kind,
            value: value.into(),
            optional: false,
            active: true,
            options: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_flags(mut self, optional: bool, active: bool) -> Self {
        self.optional = optional;
        self.active = active;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_member(mut self, member: PropertyEntry) -> Self {
        self.members.push(member);
        self
    }
}

/// Immutable structural snapshot of an object subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memento {
    pub(crate) class_name: String,
    pub(crate) uuid: Uuid,
    pub(crate) name: String,
    pub(crate) properties: Vec<PropertyEntry>,
    pub(crate) dynamic_properties: Vec<PropertyEntry>,
    pub(crate) children: Vec<Memento>,
}

impl Memento {
    pub fn new(class_name: impl Into<String>, uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            uuid,
            name: name.into(),
            properties: Vec::new(),
            dynamic_properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, entry: PropertyEntry) -> Self {
        self.properties.push(entry);
        self
    }

    pub fn with_dynamic_property(mut self, entry: PropertyEntry) -> Self {
        self.dynamic_properties.push(entry);
        self
    }

    pub fn with_child(mut self, child: Memento) -> Self {
        self.children.push(child);
        self
    }

    /// Deep snapshot of `node` and its subtree.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if `node` (or a linked child) is missing.
    pub fn capture(tree: &ObjectTree, node: NodeId) -> Result<Self, ModelError> {
        let object = tree.node(node)?;
        let mut memento = Self::new(object.class_name(), object.uuid(), object.name());
        memento.properties = object.properties().map(|p| p.to_entry()).collect();
        memento.dynamic_properties = object.dynamic_properties().map(|p| p.to_entry()).collect();
        for child in tree.children(node) {
            memento.children.push(Self::capture(tree, *child)?);
        }
        Ok(memento)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    pub fn dynamic_properties(&self) -> &[PropertyEntry] {
        &self.dynamic_properties
    }

    pub fn children(&self) -> &[Memento] {
        &self.children
    }

    /// Entry by ident, static entries first.
    pub fn property(&self, ident: &str) -> Option<&PropertyEntry> {
        self.properties
            .iter()
            .chain(self.dynamic_properties.iter())
            .find(|e| e.ident == ident)
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Memento::node_count).sum::<usize>()
    }

    /// This memento or a descendant with the given uuid.
    pub fn find_child_by_uuid(&self, uuid: &Uuid) -> Option<&Memento> {
        if self.uuid == *uuid {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_child_by_uuid(uuid))
    }

    pub(crate) fn find_mut(&mut self, uuid: &Uuid) -> Option<&mut Memento> {
        if self.uuid == *uuid {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(uuid))
    }

    /// Canonical text form.
    pub fn to_text(&self) -> String {
        let mut writer = crate::text::Writer::new();
        write_memento(&mut writer, self);
        writer.finish()
    }

    /// Parse the canonical text form.
    ///
    /// # Errors
    ///
    /// `ParseError` with line, column and element context.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let root = crate::text::parse_document(text)?;
        read_memento(&root)
    }

    /// SHA-256 (hex) over this node's own property entries.
    pub fn property_hash(&self) -> String {
        let mut writer = crate::text::Writer::new();
        for entry in &self.properties {
            write_entry(&mut writer, entry);
        }
        writer.empty("dynamicproperties", &[]);
        for entry in &self.dynamic_properties {
            write_entry(&mut writer, entry);
        }
        hash_text(&writer.finish())
    }

    /// SHA-256 (hex) over the canonical text of the whole subtree.
    pub fn full_hash(&self) -> String {
        hash_text(&self.to_text())
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

impl fmt::Display for Memento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Memento {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl ObjectTree {
    /// See [`Memento::capture`].
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if `node` is missing.
    pub fn to_memento(&self, node: NodeId) -> Result<Memento, ModelError> {
        Memento::capture(self, node)
    }
}
