use std::fmt;

use super::{AbstractProperty, Locale, PropertyCore, PropertyKind, Value, Variant};
use crate::errors::PropertyError;

/// Rust types that can back a [`Property`]
pub trait PropertyType: Clone + PartialOrd + fmt::Debug + 'static {
    const KIND: PropertyKind;

    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
    fn from_variant(variant: &Variant, locale: &Locale) -> Option<Self>;

    /// Equality used for change detection.
    fn same(&self, other: &Self) -> bool;
}

impl PropertyType for bool {
    const KIND: PropertyKind = PropertyKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn from_variant(variant: &Variant, _locale: &Locale) -> Option<Self> {
        variant.to_bool()
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl PropertyType for i32 {
    const KIND: PropertyKind = PropertyKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn from_variant(variant: &Variant, locale: &Locale) -> Option<Self> {
        variant.to_i32(locale)
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl PropertyType for f64 {
    const KIND: PropertyKind = PropertyKind::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn from_variant(variant: &Variant, locale: &Locale) -> Option<Self> {
        variant.to_f64(locale)
    }

    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl PropertyType for String {
    const KIND: PropertyKind = PropertyKind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn from_variant(variant: &Variant, locale: &Locale) -> Option<Self> {
        variant.to_string_in(locale)
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

/// Scalar property with a default and optional inclusive bounds
#[derive(Clone)]
pub struct Property<T: PropertyType> {
    core: PropertyCore,
    value: T,
    default: T,
    lower: Option<T>,
    upper: Option<T>,
}

pub type BoolProperty = Property<bool>;
pub type IntProperty = Property<i32>;
pub type DoubleProperty = Property<f64>;
pub type StringProperty = Property<String>;

impl<T: PropertyType> Property<T> {
    pub fn new(ident: impl Into<String>, default: impl Into<T>) -> Self {
        let default = default.into();
        Self {
            core: PropertyCore::new(ident),
            value: default.clone(),
            default,
            lower: None,
            upper: None,
        }
    }

    /// Read-only property whose value is produced by the system.
    pub fn monitoring(ident: impl Into<String>, default: impl Into<T>) -> Self {
        let mut property = Self::new(ident, default);
        property.core.mark_monitoring();
        property
    }

    pub fn read_only(mut self) -> Self {
        self.core.mark_read_only();
        self
    }

    /// Starts optional and therefore inactive.
    pub fn optional(mut self) -> Self {
        self.core.mark_optional();
        self
    }

    pub fn with_bounds(mut self, lower: T, upper: T) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    pub fn with_lower_bound(mut self, lower: T) -> Self {
        self.lower = Some(lower);
        self
    }

    pub fn with_upper_bound(mut self, upper: T) -> Self {
        self.upper = Some(upper);
        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn initial_value(&self) -> &T {
        &self.default
    }

    pub fn bounds(&self) -> (Option<&T>, Option<&T>) {
        (self.lower.as_ref(), self.upper.as_ref())
    }

    /// Typed user facing assignment, see [`AbstractProperty::set`].
    ///
    /// # Errors
    ///
    /// `ReadOnly` or `OutOfBounds`.
    pub fn set_value(&mut self, value: T) -> Result<bool, PropertyError> {
        self.set(value.into_value())
    }

    /// System write for monitoring properties; bypasses the read-only flag.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if bounds are configured and violated.
    pub fn set_monitored(&mut self, value: T) -> Result<bool, PropertyError> {
        self.write(value.into_value())
    }

    fn check_bounds(&self, value: &T) -> Result<(), PropertyError> {
        let below = self.lower.as_ref().is_some_and(|lower| value < lower);
        let above = self.upper.as_ref().is_some_and(|upper| value > upper);
        if below || above {
            return Err(PropertyError::OutOfBounds {
                ident: self.core.ident().to_string(),
                value: value.clone().into_value().to_text(),
            });
        }
        Ok(())
    }
}

impl<T: PropertyType> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("core", &self.core)
            .field("value", &self.value)
            .field("default", &self.default)
            .finish()
    }
}

impl<T: PropertyType> AbstractProperty for Property<T> {
    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn kind(&self) -> PropertyKind {
        T::KIND
    }

    fn get(&self) -> Value {
        self.value.clone().into_value()
    }

    fn default_value(&self) -> Value {
        self.default.clone().into_value()
    }

    fn validate(&self, value: &Value) -> Result<(), PropertyError> {
        let typed = T::from_value(value).ok_or_else(|| PropertyError::TypeMismatch {
            ident: self.core.ident().to_string(),
            expected: T::KIND,
            found: value.kind().to_string(),
        })?;
        self.check_bounds(&typed)
    }

    fn commit(&mut self, value: Value) -> bool {
        match T::from_value(&value) {
            Some(typed) if !typed.same(&self.value) => {
                self.value = typed;
                true
            }
            _ => false,
        }
    }

    fn value_from_variant(&self, variant: &Variant, locale: &Locale) -> Result<Value, PropertyError> {
        T::from_variant(variant, locale)
            .map(PropertyType::into_value)
            .ok_or_else(|| PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: T::KIND,
                found: variant.type_name().to_string(),
            })
    }
}
