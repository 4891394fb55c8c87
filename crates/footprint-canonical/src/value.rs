//! The closed value model every input resolves to.
//!
//! Floats and complex numbers compare by bit pattern, which gives `Value` a
//! total order and lets it key a `BTreeMap`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;

use crate::array::NdArray;

/// Identity of an object type inside `Object` and `KeyedObject` frames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypePath {
    /// Module that declares the type (Rust types usually pass `module_path!()`).
    pub module: String,
    /// Type name within the module.
    pub name: String,
}

impl TypePath {
    /// Creates a type path from its two components.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

/// Complex number with two binary64 components.
///
/// Equality and ordering look at the bit patterns, so `+0.0` and `-0.0`
/// components are different numbers here.
#[derive(Debug, Clone, Copy)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex {
    /// Creates a complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn bits(&self) -> (u64, u64) {
        (self.re.to_bits(), self.im.to_bits())
    }
}

impl PartialEq for Complex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Complex {}

impl PartialOrd for Complex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Complex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits().cmp(&other.bits())
    }
}

/// Raw byte string.
///
/// `Vec<u8>` resolves to a sequence of integers like any other vector; wrap
/// it in `Bytes` to get the `Bytes` variant instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

/// Named-tuple-like record: a type name plus ordered `(field, value)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NamedSequence {
    name: String,
    entries: Vec<(String, Value)>,
}

impl NamedSequence {
    /// Creates an empty record of the given type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Appends a field, keeping declaration order.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// Record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Removes and returns the first field called `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let at = self.entries.iter().position(|(field, _)| field == name)?;
        Some(self.entries.remove(at).1)
    }

    /// Consumes the record, returning its fields.
    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

/// An object frame: the type identity plus its declared payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectFrame {
    /// Declaring type.
    pub path: TypePath,
    /// State (for `Object`) or identification key (for `KeyedObject`).
    pub payload: Box<Value>,
}

impl ObjectFrame {
    /// Creates a frame.
    pub fn new(path: TypePath, payload: Value) -> Self {
        Self {
            path,
            payload: Box::new(payload),
        }
    }
}

/// Every shape a footprint can encode.
///
/// `Value` is totally ordered. Floats (and complex components) compare by
/// bit pattern, which keeps `==` in line with byte equality of the encoding.
/// The order is only a storage order for `Mapping` keys; the encoder sorts
/// mapping entries by their encoded key bytes.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null singleton.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Arbitrary-precision signed integer.
    Int(BigInt),
    /// IEEE-754 binary64.
    Float(f64),
    /// Pair of binary64 components.
    Complex(Complex),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Str(String),
    /// Ordered elements (lists, tuples).
    Sequence(Vec<Value>),
    /// Named record.
    NamedSequence(NamedSequence),
    /// Unique keys; insertion order is not part of the value.
    Mapping(BTreeMap<Value, Value>),
    /// Homogeneous numeric array.
    Array(NdArray),
    /// Reconstructable object state.
    Object(ObjectFrame),
    /// Identification-only object key.
    KeyedObject(ObjectFrame),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::Sequence(_) => "sequence",
            Value::NamedSequence(_) => "named sequence",
            Value::Mapping(_) => "mapping",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::KeyedObject(_) => "keyed object",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Complex(_) => 4,
            Value::Bytes(_) => 5,
            Value::Str(_) => 6,
            Value::Sequence(_) => 7,
            Value::NamedSequence(_) => 8,
            Value::Mapping(_) => 9,
            Value::Array(_) => 10,
            Value::Object(_) => 11,
            Value::KeyedObject(_) => 12,
        }
    }

    /// Builds a sequence from anything convertible into values.
    pub fn seq<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Builds a mapping; later duplicates replace earlier ones.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// True for the null singleton.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.to_bits().cmp(&b.to_bits()),
            (Value::Complex(a), Value::Complex(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Sequence(a), Value::Sequence(b)) => a.cmp(b),
            (Value::NamedSequence(a), Value::NamedSequence(b)) => a.cmp(b),
            (Value::Mapping(a), Value::Mapping(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => a.cmp(b),
            (Value::KeyedObject(a), Value::KeyedObject(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(BigInt::from(value))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Complex> for Value {
    fn from(value: Complex) -> Self {
        Value::Complex(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value.0)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Sequence(value)
    }
}

impl From<NamedSequence> for Value {
    fn from(value: NamedSequence) -> Self {
        Value::NamedSequence(value)
    }
}

impl From<NdArray> for Value {
    fn from(value: NdArray) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

fn write_joined<I, T>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Complex(c) => {
                let sign = if c.im.is_sign_negative() { '-' } else { '+' };
                write!(f, "({:?}{}{:?}j)", c.re, sign, c.im.abs())
            }
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Sequence(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::NamedSequence(record) => {
                write!(f, "{}(", record.name)?;
                write_joined(
                    f,
                    record
                        .entries
                        .iter()
                        .map(|(name, value)| format!("{name}={value}")),
                )?;
                f.write_str(")")
            }
            Value::Mapping(map) => {
                f.write_str("{")?;
                write_joined(f, map.iter().map(|(k, v)| format!("{k}: {v}")))?;
                f.write_str("}")
            }
            Value::Array(array) => write!(f, "{array}"),
            Value::Object(frame) => write!(f, "<{} state={}>", frame.path, frame.payload),
            Value::KeyedObject(frame) => write!(f, "<{} key={}>", frame.path, frame.payload),
        }
    }
}
