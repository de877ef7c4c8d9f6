use super::{AbstractProperty, Locale, PropertyCore, PropertyKind, Value, Variant};
use crate::errors::PropertyError;
use crate::memento::PropertyEntry;
use crate::polyvector::PolyVector;

/// Property composed of ordered member properties of any kind
#[derive(Debug)]
pub struct StructProperty {
    core: PropertyCore,
    members: PolyVector<dyn AbstractProperty>,
}

impl StructProperty {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(ident),
            members: PolyVector::new(),
        }
    }

    pub fn with_member<P: AbstractProperty>(mut self, member: P) -> Self {
        self.members.push_value(member);
        self
    }

    pub fn push_member(&mut self, member: Box<dyn AbstractProperty>) {
        self.members.push(member);
    }

    pub fn read_only(mut self) -> Self {
        self.core.mark_read_only();
        self
    }

    pub fn optional(mut self) -> Self {
        self.core.mark_optional();
        self
    }

    pub fn members(&self) -> impl Iterator<Item = &(dyn AbstractProperty + 'static)> + '_ {
        self.members.iter()
    }

    pub fn member(&self, ident: &str) -> Option<&dyn AbstractProperty> {
        self.members.iter().find(|m| m.ident() == ident)
    }

    pub fn member_mut(&mut self, ident: &str) -> Option<&mut (dyn AbstractProperty + 'static)> {
        self.members.iter_mut().find(|m| m.ident() == ident)
    }

    pub fn member_as<P: AbstractProperty>(&self, ident: &str) -> Option<&P> {
        self.member(ident)?.as_any().downcast_ref::<P>()
    }

    fn unknown_member(&self, member: &str) -> PropertyError {
        PropertyError::UnknownMember {
            ident: self.core.ident().to_string(),
            member: member.to_string(),
        }
    }
}

impl AbstractProperty for StructProperty {
    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::Struct
    }

    fn get(&self) -> Value {
        Value::Struct(
            self.members
                .iter()
                .map(|m| (m.ident().to_string(), m.get()))
                .collect(),
        )
    }

    fn default_value(&self) -> Value {
        Value::Struct(
            self.members
                .iter()
                .map(|m| (m.ident().to_string(), m.default_value()))
                .collect(),
        )
    }

    /// A struct value may name a subset of the members.
    fn validate(&self, value: &Value) -> Result<(), PropertyError> {
        let Value::Struct(entries) = value else {
            return Err(PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: PropertyKind::Struct,
                found: value.kind().to_string(),
            });
        };
        for (ident, member_value) in entries {
            let member = self
                .member(ident)
                .ok_or_else(|| self.unknown_member(ident))?;
            member.validate(member_value)?;
        }
        Ok(())
    }

    fn commit(&mut self, value: Value) -> bool {
        let Value::Struct(entries) = value else {
            return false;
        };
        let mut changed = false;
        for (ident, member_value) in entries {
            if let Some(member) = self.member_mut(&ident) {
                if member.commit(member_value) {
                    member.core_mut().bump();
                    member.notify();
                    changed = true;
                }
            }
        }
        changed
    }

    fn value_from_variant(&self, variant: &Variant, locale: &Locale) -> Result<Value, PropertyError> {
        let Variant::Map(entries) = variant else {
            return Err(PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: PropertyKind::Struct,
                found: variant.type_name().to_string(),
            });
        };
        let mut values = Vec::with_capacity(entries.len());
        for (ident, member_variant) in entries {
            let member = self
                .member(ident)
                .ok_or_else(|| self.unknown_member(ident))?;
            values.push((ident.clone(), member.value_from_variant(member_variant, locale)?));
        }
        Ok(Value::Struct(values))
    }

    fn revert(&mut self) {
        let mut changed = false;
        for member in self.members.iter_mut() {
            let before = member.revision();
            member.revert();
            changed |= member.revision() != before;
        }
        let default_active = self.core.default_active;
        if self.core.active != default_active {
            self.core.active = default_active;
            changed = true;
        }
        if changed {
            self.core.bump();
            self.notify();
        }
    }

    fn to_entry(&self) -> PropertyEntry {
        let mut entry = PropertyEntry::new(self.ident(), PropertyKind::Struct, String::new())
            .with_flags(self.is_optional(), self.is_active());
        for member in self.members.iter() {
            entry = entry.with_member(member.to_entry());
        }
        entry
    }

    /// Every member named by the entry must exist and accept its entry.
    fn check_entry(&self, entry: &PropertyEntry) -> Result<(), PropertyError> {
        if entry.kind != PropertyKind::Struct {
            return Err(PropertyError::TypeMismatch {
                ident: self.core.ident().to_string(),
                expected: PropertyKind::Struct,
                found: entry.kind.to_string(),
            });
        }
        for member_entry in &entry.members {
            self.member(&member_entry.ident)
                .ok_or_else(|| self.unknown_member(&member_entry.ident))?
                .check_entry(member_entry)?;
        }
        Ok(())
    }

    /// Members are matched by ident; members absent from the entry keep
    /// their value. Nothing is written unless every member entry checks out.
    fn apply_entry(&mut self, entry: &PropertyEntry) -> Result<bool, PropertyError> {
        self.check_entry(entry)?;
        let mut changed = false;
        for member_entry in &entry.members {
            if let Some(member) = self.member_mut(&member_entry.ident) {
                changed |= member.apply_entry(member_entry)?;
            }
        }
        changed |= self.core.restore_flags(entry.optional, entry.active);
        if changed {
            self.core.bump();
            self.notify();
        }
        Ok(changed)
    }
}
