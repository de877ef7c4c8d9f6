//! Heterogeneous owning container over a polymorphic base trait.
//!
//! A [`PolyVector<B>`] owns boxed values behind a base trait object `B`
//! (for example `dyn AbstractProperty`). Elements keep their concrete type:
//! dropping the vector or removing an element runs exactly that type's
//! destructor, and lookups can downcast back to the concrete type.
//!
//! Elements may be inserted by move, which records no clone capability, or
//! by clone, which records a clone function for the concrete type at
//! insertion time. Cloning the whole container succeeds only when every
//! element carries that capability.
//!
//! A base trait becomes usable as `B` by extending [`PolyBase`] and invoking
//! [`poly_base!`](crate::poly_base) once in the crate that defines it:
//!
//! ```
//! use strata_core::poly_base;
//! use strata_core::polyvector::{PolyBase, PolyVector};
//!
//! trait Shape: PolyBase {
//!     fn area(&self) -> f64;
//! }
//! poly_base!(Shape);
//!
//! #[derive(Clone)]
//! struct Square(f64);
//! impl Shape for Square {
//!     fn area(&self) -> f64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! let mut shapes: PolyVector<dyn Shape> = PolyVector::new();
//! shapes.push_clone(&Square(2.0));
//! assert_eq!(shapes[0].area(), 4.0);
//! assert!(shapes.try_clone().is_ok());
//! ```

use std::any::Any;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::errors::PolyVectorError;

/// Supertrait of every base usable in a [`PolyVector`]
///
/// Implemented for all `'static` types; gives trait objects access to
/// `Any` for downcasting.
pub trait PolyBase: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> PolyBase for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Unsizing from a concrete element type `T` into the base `Self`
///
/// Generated by [`poly_base!`](crate::poly_base) for `dyn Trait`.
pub trait CoerceFrom<T> {
    fn coerce(value: Box<T>) -> Box<Self>;
}

/// Declare `dyn $trait` as a [`PolyVector`] base.
#[macro_export]
macro_rules! poly_base {
    ($trait:path) => {
        impl<T: $trait> $crate::polyvector::CoerceFrom<T> for dyn $trait {
            fn coerce(value: Box<T>) -> Box<Self> {
                value
            }
        }
    };
}

type Cloner<B> = fn(&B) -> Option<Box<B>>;

struct Slot<B: ?Sized> {
    value: Box<B>,
    cloner: Option<Cloner<B>>,
}

fn clone_as<B, T>(value: &B) -> Option<Box<B>>
where
    B: ?Sized + PolyBase + CoerceFrom<T>,
    T: Clone + 'static,
{
    value
        .as_any()
        .downcast_ref::<T>()
        .map(|concrete| B::coerce(Box::new(concrete.clone())))
}

/// Ordered, owning sequence of polymorphic elements
pub struct PolyVector<B: ?Sized + PolyBase> {
    slots: Vec<Slot<B>>,
}

impl<B: ?Sized + PolyBase> PolyVector<B> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append an already boxed element; it carries no clone capability.
    pub fn push(&mut self, value: Box<B>) {
        self.slots.push(Slot {
            value,
            cloner: None,
        });
    }

    /// Append a concrete value by move (emplace).
    pub fn push_value<T>(&mut self, value: T)
    where
        B: CoerceFrom<T>,
    {
        self.push(B::coerce(Box::new(value)));
    }

    /// Append a concrete value and record its clone capability.
    pub fn push_cloneable<T>(&mut self, value: T)
    where
        B: CoerceFrom<T>,
        T: Clone + 'static,
    {
        self.slots.push(Slot {
            value: B::coerce(Box::new(value)),
            cloner: Some(clone_as::<B, T>),
        });
    }

    /// Append a copy of `value`. Only compiles for `Clone` types.
    ///
    /// ```compile_fail
    /// use strata_core::poly_base;
    /// use strata_core::polyvector::{PolyBase, PolyVector};
    ///
    /// trait Part: PolyBase {}
    /// poly_base!(Part);
    ///
    /// struct Handle(std::fs::File);
    /// impl Part for Handle {}
    ///
    /// fn copy_in(parts: &mut PolyVector<dyn Part>, handle: &Handle) {
    ///     parts.push_clone(handle);
    /// }
    /// ```
    pub fn push_clone<T>(&mut self, value: &T)
    where
        B: CoerceFrom<T>,
        T: Clone + 'static,
    {
        self.push_cloneable(value.clone());
    }

    /// Insert a boxed element at `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like `Vec::insert`.
    pub fn insert(&mut self, index: usize, value: Box<B>) {
        self.slots.insert(
            index,
            Slot {
                value,
                cloner: None,
            },
        );
    }

    /// Insert a concrete value at `index` by move.
    pub fn insert_value<T>(&mut self, index: usize, value: T)
    where
        B: CoerceFrom<T>,
    {
        self.insert(index, B::coerce(Box::new(value)));
    }

    /// Remove and return the element at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Box<B>> {
        if index < self.slots.len() {
            Some(self.slots.remove(index).value)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn get(&self, index: usize) -> Option<&B> {
        self.slots.get(index).map(|slot| &*slot.value)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut B> {
        self.slots.get_mut(index).map(|slot| &mut *slot.value)
    }

    /// Concrete view of the element at `index`, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self, index: usize) -> Option<&T> {
        self.get(index)?.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index)?.as_any_mut().downcast_mut::<T>()
    }

    /// Position of the first element matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&B) -> bool) -> Option<usize> {
        self.slots.iter().position(|slot| predicate(&slot.value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> + '_ {
        self.slots.iter().map(|slot| &*slot.value)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut B> + '_ {
        self.slots.iter_mut().map(|slot| &mut *slot.value)
    }

    /// Whether the element at `index` was inserted with a clone capability.
    pub fn is_cloneable(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.cloner.is_some())
            .unwrap_or(false)
    }

    /// Deep copy of the container.
    ///
    /// # Errors
    ///
    /// `NotCloneable` naming the first element that was inserted by move.
    pub fn try_clone(&self) -> Result<Self, PolyVectorError> {
        let mut slots = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let not_cloneable = || PolyVectorError::NotCloneable {
                index,
                type_name: (*slot.value).type_name(),
            };
            let cloner = slot.cloner.ok_or_else(not_cloneable)?;
            let value = cloner(&slot.value).ok_or_else(not_cloneable)?;
            slots.push(Slot {
                value,
                cloner: Some(cloner),
            });
        }
        Ok(Self { slots })
    }
}

impl<B: ?Sized + PolyBase> Default for PolyVector<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ?Sized + PolyBase> Index<usize> for PolyVector<B> {
    type Output = B;

    fn index(&self, index: usize) -> &B {
        &self.slots[index].value
    }
}

impl<B: ?Sized + PolyBase> IndexMut<usize> for PolyVector<B> {
    fn index_mut(&mut self, index: usize) -> &mut B {
        &mut self.slots[index].value
    }
}

impl<B: ?Sized + PolyBase> fmt::Debug for PolyVector<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| (*slot.value).type_name()))
            .finish()
    }
}
