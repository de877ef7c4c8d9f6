//! Property kinds, static values and dynamic variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of property kinds; the lowercase name is the `type` tag of
/// the text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Bool,
    Int,
    Double,
    String,
    Enum,
    Struct,
}

impl PropertyKind {
    pub fn tag(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Int => "int",
            PropertyKind::Double => "double",
            PropertyKind::String => "string",
            PropertyKind::Enum => "enum",
            PropertyKind::Struct => "struct",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "bool" => Some(PropertyKind::Bool),
            "int" => Some(PropertyKind::Int),
            "double" => Some(PropertyKind::Double),
            "string" => Some(PropertyKind::String),
            "enum" => Some(PropertyKind::Enum),
            "struct" => Some(PropertyKind::Struct),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Statically kinded property value
///
/// Equality on `Double` is bit-exact, so `-0.0 != 0.0` and a NaN equals the
/// same NaN. This is what "unchanged" means for change notification.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    Enum(String),
    /// Member idents with their values, in declaration order
    Struct(Vec<(String, Value)>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Value::Bool(_) => PropertyKind::Bool,
            Value::Int(_) => PropertyKind::Int,
            Value::Double(_) => PropertyKind::Double,
            Value::String(_) => PropertyKind::String,
            Value::Enum(_) => PropertyKind::Enum,
            Value::Struct(_) => PropertyKind::Struct,
        }
    }

    /// Canonical, locale independent text of a leaf value.
    ///
    /// Doubles use the shortest representation that parses back to the same
    /// bits. Struct values have no leaf text and yield an empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) | Value::Enum(s) => s.clone(),
            Value::Struct(_) => String::new(),
        }
    }

    /// Parse canonical leaf text as `kind`. `None` if the text does not fit.
    pub fn parse(kind: PropertyKind, text: &str) -> Option<Value> {
        match kind {
            PropertyKind::Bool => match text.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            PropertyKind::Int => text.trim().parse().ok().map(Value::Int),
            PropertyKind::Double => text.trim().parse().ok().map(Value::Double),
            PropertyKind::String => Some(Value::String(text.to_string())),
            PropertyKind::Enum => Some(Value::Enum(text.to_string())),
            PropertyKind::Struct => None,
        }
    }

    /// Dynamic representation of this value.
    pub fn to_variant(&self) -> Variant {
        match self {
            Value::Bool(b) => Variant::Bool(*b),
            Value::Int(i) => Variant::Int(i64::from(*i)),
            Value::Double(d) => Variant::Double(*d),
            Value::String(s) | Value::Enum(s) => Variant::String(s.clone()),
            Value::Struct(members) => Variant::Map(
                members
                    .iter()
                    .map(|(ident, value)| (ident.clone(), value.to_variant()))
                    .collect(),
            ),
        }
    }
}

/// Number formatting conventions used when variants carry text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub decimal_separator: char,
}

impl Locale {
    /// The locale of the persisted text form
    pub const C: Locale = Locale {
        decimal_separator: '.',
    };

    pub fn with_decimal_separator(decimal_separator: char) -> Self {
        Self { decimal_separator }
    }

    /// Rewrite a locale formatted number into C notation.
    pub fn normalize_number(&self, text: &str) -> String {
        let trimmed = text.trim();
        if self.decimal_separator == '.' {
            trimmed.to_string()
        } else {
            trimmed.replace(self.decimal_separator, ".")
        }
    }

    /// Format a double for display in this locale.
    pub fn format_double(&self, value: f64) -> String {
        let text = value.to_string();
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::C
    }
}

/// Dynamically typed value exchanged with collaborators (editors, scripts)
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Map(Vec<(String, Variant)>),
}

impl Variant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Null => "null",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Double(_) => "double",
            Variant::String(_) => "string",
            Variant::Map(_) => "map",
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::Int(0) => Some(false),
            Variant::Int(1) => Some(true),
            Variant::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 32-bit integer view; fails on overflow or on fractional doubles.
    pub fn to_i32(&self, locale: &Locale) -> Option<i32> {
        match self {
            Variant::Int(i) => i32::try_from(*i).ok(),
            Variant::Double(d) if d.fract() == 0.0 => {
                if *d >= f64::from(i32::MIN) && *d <= f64::from(i32::MAX) {
                    Some(*d as i32)
                } else {
                    None
                }
            }
            Variant::String(s) => locale.normalize_number(s).parse().ok(),
            _ => None,
        }
    }

    pub fn to_f64(&self, locale: &Locale) -> Option<f64> {
        match self {
            Variant::Double(d) => Some(*d),
            Variant::Int(i) => Some(*i as f64),
            Variant::String(s) => locale.normalize_number(s).parse().ok(),
            _ => None,
        }
    }

    pub fn to_string_in(&self, locale: &Locale) -> Option<String> {
        match self {
            Variant::String(s) => Some(s.clone()),
            Variant::Bool(b) => Some(b.to_string()),
            Variant::Int(i) => Some(i.to_string()),
            Variant::Double(d) => Some(locale.format_double(*d)),
            Variant::Null | Variant::Map(_) => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Null => f.write_str("null"),
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(i) => write!(f, "{}", i),
            Variant::Double(d) => write!(f, "{}", d),
            Variant::String(s) => write!(f, "{:?}", s),
            Variant::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_text_round_trips_bit_exact() {
        for d in [0.1, 1.0 / 3.0, -0.0, 1e-300, 6.02214076e23, f64::MAX, f64::MIN_POSITIVE] {
            let text = Value::Double(d).to_text();
            let back = Value::parse(PropertyKind::Double, &text).unwrap();
            assert_eq!(back, Value::Double(d), "text {}", text);
        }
    }

    #[test]
    fn test_integer_text_is_canonical() {
        assert_eq!(Value::Double(2.0).to_text(), "2");
        assert_eq!(Value::Int(i32::MIN).to_text(), "-2147483648");
        assert_eq!(
            Value::parse(PropertyKind::Int, "2147483647"),
            Some(Value::Int(i32::MAX))
        );
        assert_eq!(Value::parse(PropertyKind::Int, "2147483648"), None);
    }

    #[test]
    fn test_bit_exact_equality() {
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Int(1), Value::Double(1.0));
    }

    #[test]
    fn test_locale_aware_variant_conversion() {
        let german = Locale::with_decimal_separator(',');
        let v = Variant::String("2,5".to_string());
        assert_eq!(v.to_f64(&german), Some(2.5));
        assert_eq!(v.to_f64(&Locale::C), None);
        assert_eq!(
            Variant::Double(2.5).to_string_in(&german),
            Some("2,5".to_string())
        );
    }

    #[test]
    fn test_variant_int_range() {
        assert_eq!(Variant::Int(i64::from(i32::MAX)).to_i32(&Locale::C), Some(i32::MAX));
        assert_eq!(Variant::Int(i64::from(i32::MAX) + 1).to_i32(&Locale::C), None);
        assert_eq!(Variant::Double(3.0).to_i32(&Locale::C), Some(3));
        assert_eq!(Variant::Double(3.5).to_i32(&Locale::C), None);
    }

    #[test]
    fn test_kind_tags() {
        for kind in [
            PropertyKind::Bool,
            PropertyKind::Int,
            PropertyKind::Double,
            PropertyKind::String,
            PropertyKind::Enum,
            PropertyKind::Struct,
        ] {
            assert_eq!(PropertyKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(PropertyKind::from_tag("objectlist"), None);
    }
}
