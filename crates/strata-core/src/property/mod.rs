//! Typed, named leaf value holders.
//!
//! Every property implements [`AbstractProperty`], the object safe interface
//! that nodes, mementos and patches work against. Concrete kinds are the
//! generic [`Property<T>`] (`bool`, `i32`, `f64`, `String`),
//! [`EnumProperty`] and [`StructProperty`].
//!
//! Writes go through three layers:
//!
//! - `validate` + `commit` (per kind) check and store a value silently;
//! - `write` stores, bumps the revision and notifies listeners, without
//!   looking at the read-only flag (system writes, restore, patch);
//! - `set` / `set_from_variant` reject writes to read-only properties and
//!   otherwise behave like `write`.

mod enumeration;
mod structure;
mod typed;
mod value;

use std::fmt;
use std::rc::Rc;

use crate::errors::PropertyError;
use crate::memento::PropertyEntry;
use crate::polyvector::PolyBase;

pub use enumeration::EnumProperty;
pub use structure::StructProperty;
pub use typed::{
    BoolProperty, DoubleProperty, IntProperty, Property, PropertyType, StringProperty,
};
pub use value::{Locale, PropertyKind, Value, Variant};

/// Change listener; receives the property after the new value is committed.
pub type Listener = Rc<dyn Fn(&dyn AbstractProperty)>;

/// State shared by every property kind
pub struct PropertyCore {
    ident: String,
    read_only: bool,
    monitoring: bool,
    optional: bool,
    active: bool,
    default_active: bool,
    revision: u64,
    listeners: Vec<Listener>,
}

impl PropertyCore {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            read_only: false,
            monitoring: false,
            optional: false,
            active: true,
            default_active: true,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Construction time read-only flag.
    pub(crate) fn mark_read_only(&mut self) {
        self.read_only = true;
    }

    /// Construction time monitoring flag; implies read-only.
    pub(crate) fn mark_monitoring(&mut self) {
        self.monitoring = true;
        self.read_only = true;
    }

    /// Construction time optional flag; the property starts inactive.
    pub(crate) fn mark_optional(&mut self) {
        self.optional = true;
        self.active = false;
        self.default_active = false;
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Apply stored optional/active flags. Returns whether anything changed.
    fn restore_flags(&mut self, optional: bool, active: bool) -> bool {
        let active = if optional { active } else { true };
        let changed = self.optional != optional || self.active != active;
        self.optional = optional;
        self.active = active;
        changed
    }
}

/// Copies flags and revision; listeners stay with the original.
impl Clone for PropertyCore {
    fn clone(&self) -> Self {
        Self {
            ident: self.ident.clone(),
            read_only: self.read_only,
            monitoring: self.monitoring,
            optional: self.optional,
            active: self.active,
            default_active: self.default_active,
            revision: self.revision,
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for PropertyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCore")
            .field("ident", &self.ident)
            .field("read_only", &self.read_only)
            .field("monitoring", &self.monitoring)
            .field("optional", &self.optional)
            .field("active", &self.active)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Access to a property as a trait object, available on every property.
pub trait AsDynProperty {
    fn as_dyn(&self) -> &dyn AbstractProperty;
    fn as_dyn_mut(&mut self) -> &mut dyn AbstractProperty;
}

impl<P: AbstractProperty> AsDynProperty for P {
    fn as_dyn(&self) -> &dyn AbstractProperty {
        self
    }

    fn as_dyn_mut(&mut self) -> &mut dyn AbstractProperty {
        self
    }
}

/// Object safe property interface
pub trait AbstractProperty: PolyBase + AsDynProperty {
    fn core(&self) -> &PropertyCore;
    fn core_mut(&mut self) -> &mut PropertyCore;
    fn kind(&self) -> PropertyKind;

    /// Current value.
    fn get(&self) -> Value;

    /// Constructor time value, target of `revert`.
    fn default_value(&self) -> Value;

    /// Check that `value` may be stored, without storing it.
    ///
    /// # Errors
    ///
    /// `TypeMismatch`, `OutOfBounds`, `InvalidEnumValue` or `UnknownMember`.
    fn validate(&self, value: &Value) -> Result<(), PropertyError>;

    /// Store a validated value. Returns whether the stored value changed.
    fn commit(&mut self, value: Value) -> bool;

    /// Convert a dynamic value into this property's kind.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the variant cannot represent this kind.
    fn value_from_variant(&self, variant: &Variant, locale: &Locale)
        -> Result<Value, PropertyError>;

    fn ident(&self) -> &str {
        self.core().ident()
    }

    fn is_read_only(&self) -> bool {
        self.core().read_only
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.core_mut().read_only = read_only;
    }

    fn is_monitoring(&self) -> bool {
        self.core().monitoring
    }

    fn is_optional(&self) -> bool {
        self.core().optional
    }

    fn is_active(&self) -> bool {
        self.core().active
    }

    /// Counter bumped by every committed change.
    fn revision(&self) -> u64 {
        self.core().revision
    }

    fn subscribe(&mut self, listener: Listener) {
        self.core_mut().listeners.push(listener);
    }

    /// Call every listener with the current state.
    fn notify(&self) {
        let listeners = self.core().listeners.clone();
        for listener in listeners {
            listener(self.as_dyn());
        }
    }

    /// Validate and commit without notification.
    ///
    /// # Errors
    ///
    /// See [`validate`](AbstractProperty::validate).
    fn store(&mut self, value: Value) -> Result<bool, PropertyError> {
        self.validate(&value)?;
        Ok(self.commit(value))
    }

    /// Store, then bump the revision and notify if the value changed.
    /// Ignores the read-only flag.
    ///
    /// # Errors
    ///
    /// See [`validate`](AbstractProperty::validate).
    fn write(&mut self, value: Value) -> Result<bool, PropertyError> {
        let changed = self.store(value)?;
        if changed {
            self.core_mut().bump();
            self.notify();
        }
        Ok(changed)
    }

    /// User facing assignment. Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// `ReadOnly` for read-only properties (the value stays untouched),
    /// otherwise as [`validate`](AbstractProperty::validate).
    fn set(&mut self, value: Value) -> Result<bool, PropertyError> {
        if self.is_read_only() {
            return Err(PropertyError::ReadOnly {
                ident: self.ident().to_string(),
            });
        }
        self.write(value)
    }

    /// User facing assignment from a dynamic value.
    ///
    /// # Errors
    ///
    /// `ReadOnly` for read-only properties, `TypeMismatch` if the variant
    /// cannot be converted.
    fn set_from_variant(&mut self, variant: &Variant, locale: &Locale) -> Result<bool, PropertyError> {
        if self.is_read_only() {
            return Err(PropertyError::ReadOnly {
                ident: self.ident().to_string(),
            });
        }
        let value = self.value_from_variant(variant, locale)?;
        self.write(value)
    }

    /// Dynamic view of the current value.
    fn to_variant(&self) -> Variant {
        self.get().to_variant()
    }

    /// Only effective while the property is optional.
    fn set_active(&mut self, active: bool) {
        if !self.is_optional() || self.is_active() == active {
            return;
        }
        self.core_mut().active = active;
        self.core_mut().bump();
        self.notify();
    }

    /// `true` forces the property inactive, `false` forces it active.
    fn set_optional(&mut self, optional: bool) {
        let active = !optional;
        let changed = self.core().active != active;
        let core = self.core_mut();
        core.optional = optional;
        core.active = active;
        if changed {
            core.bump();
            self.notify();
        }
    }

    /// Back to the constructor time value and active state.
    fn revert(&mut self) {
        let default = self.default_value();
        let mut changed = self.commit(default);
        let default_active = self.core().default_active;
        if self.core().active != default_active {
            self.core_mut().active = default_active;
            changed = true;
        }
        if changed {
            self.core_mut().bump();
            self.notify();
        }
    }

    /// Snapshot of value and flags.
    fn to_entry(&self) -> PropertyEntry {
        PropertyEntry::new(self.ident(), self.kind(), self.get().to_text())
            .with_flags(self.is_optional(), self.is_active())
    }

    /// Value carried by a snapshot, converted to this property's kind.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the entry kind differs, `Malformed` if its text does
    /// not parse.
    fn entry_value(&self, entry: &PropertyEntry) -> Result<Value, PropertyError> {
        if entry.kind != self.kind() {
            return Err(PropertyError::TypeMismatch {
                ident: self.ident().to_string(),
                expected: self.kind(),
                found: entry.kind.to_string(),
            });
        }
        Value::parse(entry.kind, &entry.value).ok_or_else(|| PropertyError::Malformed {
            ident: self.ident().to_string(),
            kind: entry.kind,
            text: entry.value.clone(),
        })
    }

    /// Whether [`apply_entry`](AbstractProperty::apply_entry) would succeed,
    /// without touching anything.
    ///
    /// # Errors
    ///
    /// As [`apply_entry`](AbstractProperty::apply_entry).
    fn check_entry(&self, entry: &PropertyEntry) -> Result<(), PropertyError> {
        let value = self.entry_value(entry)?;
        self.validate(&value)
    }

    /// Apply a snapshot taken by [`to_entry`](AbstractProperty::to_entry).
    /// Ignores the read-only flag; notifies once if anything changed.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the entry kind differs, `Malformed` if its text does
    /// not parse, otherwise as [`validate`](AbstractProperty::validate).
    fn apply_entry(&mut self, entry: &PropertyEntry) -> Result<bool, PropertyError> {
        let value = self.entry_value(entry)?;
        let mut changed = self.store(value)?;
        changed |= self.core_mut().restore_flags(entry.optional, entry.active);
        if changed {
            self.core_mut().bump();
            self.notify();
        }
        Ok(changed)
    }
}

crate::poly_base!(AbstractProperty);

impl fmt::Debug for dyn AbstractProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("ident", &self.ident())
            .field("kind", &self.kind())
            .field("value", &self.get())
            .finish()
    }
}

/// Build a free standing property from a snapshot, as used for dynamic
/// properties that no class declares.
///
/// An entry carries kind, value, enum options, the optional and active flags
/// and struct members. Read-only, monitoring and bounds are not part of it,
/// so the rebuilt property is writable and unbounded.
///
/// # Errors
///
/// `Malformed` if a leaf text does not parse as its kind, or if an enum
/// entry carries no options.
pub fn property_from_entry(entry: &PropertyEntry) -> Result<Box<dyn AbstractProperty>, PropertyError> {
    let malformed = || PropertyError::Malformed {
        ident: entry.ident.clone(),
        kind: entry.kind,
        text: entry.value.clone(),
    };
    let mut property: Box<dyn AbstractProperty> = match entry.kind {
        PropertyKind::Bool => match Value::parse(entry.kind, &entry.value) {
            Some(Value::Bool(v)) => Box::new(BoolProperty::new(&entry.ident, v)),
            _ => return Err(malformed()),
        },
        PropertyKind::Int => match Value::parse(entry.kind, &entry.value) {
            Some(Value::Int(v)) => Box::new(IntProperty::new(&entry.ident, v)),
            _ => return Err(malformed()),
        },
        PropertyKind::Double => match Value::parse(entry.kind, &entry.value) {
            Some(Value::Double(v)) => Box::new(DoubleProperty::new(&entry.ident, v)),
            _ => return Err(malformed()),
        },
        PropertyKind::String => Box::new(StringProperty::new(&entry.ident, entry.value.clone())),
        PropertyKind::Enum => {
            if entry.options.is_empty() {
                return Err(malformed());
            }
            Box::new(EnumProperty::new(
                &entry.ident,
                entry.options.clone(),
                &entry.value,
            )?)
        }
        PropertyKind::Struct => {
            let mut structure = StructProperty::new(&entry.ident);
            for member in &entry.members {
                structure.push_member(property_from_entry(member)?);
            }
            Box::new(structure)
        }
    };
    property.core_mut().restore_flags(entry.optional, entry.active);
    Ok(property)
}
