//! Capability resolution: turning arbitrary inputs into [`Value`] trees.
//!
//! Each input is resolved in a fixed priority order:
//!
//! 1. [`KeyProtocol`] (via [`Encodable::as_keyed`]) produces a `KeyedObject`.
//! 2. [`StateProtocol`] (via [`Encodable::as_stateful`]) produces an `Object`.
//! 3. [`Encodable::to_value`] maps builtin shapes, recursing into elements.
//! 4. Anything else fails with [`EncodeError::UnsupportedType`].
//!
//! The key protocol always wins when a type exposes both.
//!
//! Every nested `resolve` call counts as one level against
//! [`MAX_DEPTH`], so smart pointers and `Option` wrappers use up depth too.

use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::array::NdArray;
use crate::encoder::MAX_DEPTH;
use crate::errors::EncodeError;
use crate::value::{Bytes, Complex, ObjectFrame, TypePath, Value};

/// Identification-only capability. The payload is never used to rebuild the
/// instance; decoding yields the literal `(path, payload)` frame.
pub trait KeyProtocol {
    /// Type identity written into the frame.
    fn type_path(&self) -> TypePath;

    /// Payload that identifies this instance.
    fn footprint_key(&self, resolver: &mut Resolver) -> Result<Value, EncodeError>;
}

/// Reconstructable capability, paired with
/// [`Reconstruct`](crate::registry::Reconstruct) on the decoding side.
pub trait StateProtocol {
    /// Type identity written into the frame.
    fn type_path(&self) -> TypePath;

    /// Declared state; enough to rebuild an equal instance.
    fn state(&self, resolver: &mut Resolver) -> Result<Value, EncodeError>;
}

/// Anything the resolver can be asked about.
///
/// Implementors opt into exactly the capabilities they have. A type that
/// overrides nothing is unsupported.
pub trait Encodable {
    /// Returns the key capability, if any.
    fn as_keyed(&self) -> Option<&dyn KeyProtocol> {
        None
    }

    /// Returns the state capability, if any.
    fn as_stateful(&self) -> Option<&dyn StateProtocol> {
        None
    }

    /// Maps a builtin shape to its value, resolving children through `resolver`.
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        let _ = resolver;
        Err(EncodeError::UnsupportedType(self.type_name()))
    }

    /// Concrete type name, for diagnostics and identity tracking.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Recursive resolver with cycle detection.
///
/// Inputs currently being resolved are tracked by address and concrete type;
/// meeting one of them again means the structure refers back to itself.
#[derive(Debug, Default)]
pub struct Resolver {
    visiting: HashSet<(usize, &'static str)>,
    depth: usize,
}

impl Resolver {
    /// Creates a resolver with an empty visiting set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `input` into a value.
    pub fn resolve<T: Encodable + ?Sized>(&mut self, input: &T) -> Result<Value, EncodeError> {
        if self.depth > MAX_DEPTH {
            return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
        }
        // zero-sized values hold nothing and may share addresses
        let identity = (std::mem::size_of_val(input) > 0)
            .then(|| (input as *const T).cast::<()>() as usize)
            .map(|addr| (addr, input.type_name()));

        if let Some(id) = identity {
            if !self.visiting.insert(id) {
                return Err(EncodeError::CyclicReference(input.type_name()));
            }
        }
        self.depth += 1;
        let result = self.dispatch(input);
        self.depth -= 1;
        if let Some(id) = identity {
            self.visiting.remove(&id);
        }
        result
    }

    fn dispatch<T: Encodable + ?Sized>(&mut self, input: &T) -> Result<Value, EncodeError> {
        if let Some(keyed) = input.as_keyed() {
            let payload = keyed.footprint_key(self)?;
            return Ok(Value::KeyedObject(ObjectFrame::new(
                keyed.type_path(),
                payload,
            )));
        }
        if let Some(stateful) = input.as_stateful() {
            let payload = stateful.state(self)?;
            return Ok(Value::Object(ObjectFrame::new(
                stateful.type_path(),
                payload,
            )));
        }
        input.to_value(self)
    }

    /// Resolves each item into a sequence.
    pub fn sequence<'a, T, I>(&mut self, items: I) -> Result<Value, EncodeError>
    where
        T: Encodable + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let values = items
            .into_iter()
            .map(|item| self.resolve(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Sequence(values))
    }

    /// Resolves each pair into a mapping.
    ///
    /// Distinct inputs whose keys resolve to the same value (`None` and
    /// `Some(None)`, say) fail with [`EncodeError::DuplicateKey`].
    pub fn mapping<'a, K, V, I>(&mut self, entries: I) -> Result<Value, EncodeError>
    where
        K: Encodable + ?Sized + 'a,
        V: Encodable + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = self.resolve(key)?;
            let value = self.resolve(value)?;
            match map.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(slot) => {
                    return Err(EncodeError::DuplicateKey(slot.key().to_string()));
                }
            }
        }
        Ok(Value::Mapping(map))
    }
}

/// Resolves `input` with a fresh resolver.
pub fn resolve<T: Encodable + ?Sized>(input: &T) -> Result<Value, EncodeError> {
    Resolver::new().resolve(input)
}

impl Encodable for Value {
    fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(self.clone())
    }
}

impl Encodable for () {
    fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::Null)
    }
}

impl Encodable for bool {
    fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::Bool(*self))
    }
}

macro_rules! encodable_via_from {
    ($($ty:ty),*) => {
        $(
            impl Encodable for $ty {
                fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
                    Ok(Value::from(self.clone()))
                }
            }
        )*
    };
}

encodable_via_from!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, BigInt, f64, Complex,
    String, Bytes, NdArray
);

impl Encodable for f32 {
    fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::Float(f64::from(*self)))
    }
}

impl Encodable for str {
    fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::Str(self.to_string()))
    }
}

impl<T: Encodable> Encodable for [T] {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.sequence(self)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.sequence(self)
    }
}

impl<T: Encodable, const N: usize> Encodable for [T; N] {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.sequence(self)
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        match self {
            Some(inner) => resolver.resolve(inner),
            None => Ok(Value::Null),
        }
    }
}

impl<K: Encodable, V: Encodable> Encodable for BTreeMap<K, V> {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.mapping(self)
    }
}

impl<K: Encodable, V: Encodable, S: BuildHasher> Encodable for HashMap<K, V, S> {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.mapping(self)
    }
}

macro_rules! encodable_tuple {
    ($($name:ident),+) => {
        impl<$($name: Encodable),+> Encodable for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
                let ($($name,)+) = self;
                Ok(Value::Sequence(vec![$(resolver.resolve($name)?),+]))
            }
        }
    };
}

encodable_tuple!(A);
encodable_tuple!(A, B);
encodable_tuple!(A, B, C);
encodable_tuple!(A, B, C, D);
encodable_tuple!(A, B, C, D, E);
encodable_tuple!(A, B, C, D, E, F);

macro_rules! encodable_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: Encodable + ?Sized> Encodable for $ptr<T> {
                fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
                    resolver.resolve(&**self)
                }
            }
        )*
    };
}

encodable_pointer!(Box, Rc, Arc);

impl<T: Encodable + ?Sized> Encodable for &T {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        resolver.resolve(*self)
    }
}

impl<T: Encodable + ?Sized> Encodable for RefCell<T> {
    fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        let inner = self
            .try_borrow()
            .map_err(|_| EncodeError::Borrowed(self.type_name()))?;
        resolver.resolve(&*inner)
    }
}
