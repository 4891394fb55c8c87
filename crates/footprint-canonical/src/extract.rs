//! Typed extraction from decoded values.
//!
//! Reconstructors receive their state as a [`Value`]; [`FromValue`] turns the
//! pieces back into Rust types and reports shape mismatches as
//! [`DecodeError::Extract`].

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::array::NdArray;
use crate::errors::DecodeError;
use crate::value::{Bytes, Complex, NamedSequence, Value};

/// Conversion out of a decoded [`Value`].
pub trait FromValue: Sized {
    /// Converts `value`, failing when its shape does not match.
    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

fn mismatch(expected: &str, found: &Value) -> DecodeError {
    DecodeError::Extract(format!("expected {expected}, found {}", found.kind()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch("null", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for BigInt {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int(int) => Ok(int),
            other => Err(mismatch("int", &other)),
        }
    }
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    let int = BigInt::from_value(value)?;
                    <$ty>::try_from(&int).map_err(|_| {
                        DecodeError::Extract(format!(
                            "integer {int} out of range for {}",
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

from_value_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(x) => Ok(x),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for Complex {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Complex(c) => Ok(c),
            other => Err(mismatch("complex", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(Bytes(b)),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromValue for NdArray {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(array) => Ok(array),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl FromValue for NamedSequence {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::NamedSequence(record) => Ok(record),
            other => Err(mismatch("named sequence", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Sequence(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("sequence", &other)),
        }
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Mapping(map) => map
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch("mapping", &other)),
        }
    }
}

macro_rules! from_value_tuple {
    ($len:literal => $($name:ident),+) => {
        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                let items = match value {
                    Value::Sequence(items) if items.len() == $len => items,
                    other => return Err(mismatch(concat!("sequence of ", $len), &other)),
                };
                let mut items = items.into_iter();
                Ok(($(
                    $name::from_value(items.next().unwrap_or(Value::Null))?,
                )+))
            }
        }
    };
}

from_value_tuple!(1 => A);
from_value_tuple!(2 => A, B);
from_value_tuple!(3 => A, B, C);
from_value_tuple!(4 => A, B, C, D);

impl Value {
    /// Converts into `T`; shorthand for [`FromValue::from_value`].
    pub fn extract<T: FromValue>(self) -> Result<T, DecodeError> {
        T::from_value(self)
    }
}

impl NamedSequence {
    /// Removes field `name` and converts it into `T`.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, DecodeError> {
        let value = self
            .remove(name)
            .ok_or_else(|| DecodeError::Extract(format!("missing field {name:?}")))?;
        T::from_value(value)
    }
}
