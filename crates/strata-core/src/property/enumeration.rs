use super::{AbstractProperty, Locale, PropertyCore, PropertyKind, Value, Variant};
use crate::errors::PropertyError;
use crate::memento::PropertyEntry;

/// Property holding one of a fixed, ordered list of options
#[derive(Debug, Clone)]
pub struct EnumProperty {
    core: PropertyCore,
    options: Vec<String>,
    value: String,
    default: String,
}

impl EnumProperty {
    /// # Errors
    ///
    /// `InvalidEnumValue` if `default` is not one of `options`.
    pub fn new(
        ident: impl Into<String>,
        options: Vec<String>,
        default: impl Into<String>,
    ) -> Result<Self, PropertyError> {
        let ident = ident.into();
        let default = default.into();
        if !options.contains(&default) {
            return Err(PropertyError::InvalidEnumValue {
                ident,
                value: default,
            });
        }
        Ok(Self {
            core: PropertyCore::new(ident),
            options,
            value: default.clone(),
            default,
        })
    }

    pub fn read_only(mut self) -> Self {
        self.core.mark_read_only();
        self
    }

    pub fn optional(mut self) -> Self {
        self.core.mark_optional();
        self
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Position of the current value in the option list.
    pub fn index(&self) -> usize {
        self.options
            .iter()
            .position(|option| *option == self.value)
            .unwrap_or(0)
    }
}

impl AbstractProperty for EnumProperty {
    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::Enum
    }

    fn get(&self) -> Value {
        Value::Enum(self.value.clone())
    }

    fn default_value(&self) -> Value {
        Value::Enum(self.default.clone())
    }

    fn validate(&self, value: &Value) -> Result<(), PropertyError> {
        match value {
            Value::Enum(option) if self.options.contains(option) => Ok(()),
            Value::Enum(option) => Err(PropertyError::InvalidEnumValue {
                ident: self.core.ident().to_string(),
                value: option.clone(),
            }),
            other => Err(PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: PropertyKind::Enum,
                found: other.kind().to_string(),
            }),
        }
    }

    fn commit(&mut self, value: Value) -> bool {
        match value {
            Value::Enum(option) if option != self.value => {
                self.value = option;
                true
            }
            _ => false,
        }
    }

    /// Accepts the option text, or its index as an integer.
    fn value_from_variant(&self, variant: &Variant, _locale: &Locale) -> Result<Value, PropertyError> {
        match variant {
            Variant::String(option) => Ok(Value::Enum(option.clone())),
            Variant::Int(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.options.get(i))
                .map(|option| Value::Enum(option.clone()))
                .ok_or_else(|| PropertyError::InvalidEnumValue {
                    ident: self.core.ident().to_string(),
                    value: index.to_string(),
                }),
            other => Err(PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: PropertyKind::Enum,
                found: other.type_name().to_string(),
            }),
        }
    }

    fn to_entry(&self) -> PropertyEntry {
        PropertyEntry::new(self.ident(), PropertyKind::Enum, self.value.clone())
            .with_flags(self.is_optional(), self.is_active())
            .with_options(self.options.clone())
    }
}
