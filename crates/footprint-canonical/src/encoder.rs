//! Canonical encoder: [`Value`] to footprint bytes.
//!
//! A footprint is `[FORMAT_VERSION][tagged value]`. Every length and count is
//! a big-endian `u32`, so each value is self-delimiting and no encoding is a
//! prefix of another. Mapping entries are written in the byte order of their
//! encoded keys, which makes the output independent of insertion order.

use num_bigint::Sign;
use tracing::debug;

use crate::errors::EncodeError;
use crate::resolver::{Encodable, Resolver};
use crate::value::{ObjectFrame, Value};

/// Format version written in front of every footprint.
pub const FORMAT_VERSION: u8 = 0x01;

/// Deepest container nesting a footprint may hold. The top-level value sits
/// at depth 0; every sequence element, record field, mapping key or value and
/// object payload sits one level below its container.
///
/// The resolver, the encoder and the decoder all enforce the same limit, so
/// every footprint that encodes also decodes.
pub const MAX_DEPTH: usize = 128;

/// Type tags.
pub mod tags {
    /// Null singleton.
    pub const NULL: u8 = 0x00;
    /// `true`.
    pub const TRUE: u8 = 0x01;
    /// `false`.
    pub const FALSE: u8 = 0x02;
    /// Arbitrary-precision integer.
    pub const INT: u8 = 0x03;
    /// binary64.
    pub const FLOAT: u8 = 0x04;
    /// Two binary64 components.
    pub const COMPLEX: u8 = 0x05;
    /// UTF-8 text.
    pub const STR: u8 = 0x06;
    /// Raw bytes.
    pub const BYTES: u8 = 0x07;
    /// Ordered sequence.
    pub const SEQUENCE: u8 = 0x08;
    /// Named record.
    pub const NAMED_SEQUENCE: u8 = 0x09;
    /// Canonically sorted mapping.
    pub const MAPPING: u8 = 0x0A;
    /// Array sub-codec blob.
    pub const ARRAY: u8 = 0x0B;
    /// Reconstructable object.
    pub const OBJECT: u8 = 0x0C;
    /// Identification-only object.
    pub const KEYED_OBJECT: u8 = 0x0D;
}

/// Integer sign flag for zero and positive magnitudes.
pub(crate) const SIGN_NON_NEGATIVE: u8 = 0x00;
/// Integer sign flag for negative magnitudes.
pub(crate) const SIGN_NEGATIVE: u8 = 0x01;

/// Resolves `input` and returns its footprint.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use footprint_canonical::encode;
///
/// let a: HashMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
/// let b: HashMap<&str, i32> = [("b", 2), ("a", 1)].into_iter().collect();
/// assert_eq!(encode(&a)?, encode(&b)?);
/// assert_ne!(encode(&1)?, encode(&1.0)?);
/// # Ok::<(), footprint_canonical::EncodeError>(())
/// ```
///
/// # Errors
///
/// Returns [`EncodeError`] when the input (or anything it contains) is
/// unsupported, refers back to itself, nests deeper than [`MAX_DEPTH`], or
/// is too large for the framing.
pub fn encode<T: Encodable + ?Sized>(input: &T) -> Result<Vec<u8>, EncodeError> {
    let value = Resolver::new().resolve(input)?;
    encode_value(&value)
}

/// Encodes an already-resolved value.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut buf = vec![FORMAT_VERSION];
    write_value(&mut buf, value, 0)?;
    debug!(kind = value.kind(), len = buf.len(), "encoded footprint");
    Ok(buf)
}

fn write_len(buf: &mut Vec<u8>, what: &'static str, len: usize) -> Result<(), EncodeError> {
    let len32 = u32::try_from(len).map_err(|_| EncodeError::LengthOverflow { what, len })?;
    buf.extend_from_slice(&len32.to_be_bytes());
    Ok(())
}

fn write_str(buf: &mut Vec<u8>, what: &'static str, s: &str) -> Result<(), EncodeError> {
    write_len(buf, what, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_frame(
    buf: &mut Vec<u8>,
    tag: u8,
    frame: &ObjectFrame,
    depth: usize,
) -> Result<(), EncodeError> {
    buf.push(tag);
    write_str(buf, "module name", &frame.path.module)?;
    write_str(buf, "type name", &frame.path.name)?;
    write_value(buf, &frame.payload, depth + 1)
}

/// Appends the tagged encoding of `value` (no version byte).
pub(crate) fn write_value(buf: &mut Vec<u8>, value: &Value, depth: usize) -> Result<(), EncodeError> {
    if depth > MAX_DEPTH {
        return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
    }
    match value {
        Value::Null => buf.push(tags::NULL),
        Value::Bool(true) => buf.push(tags::TRUE),
        Value::Bool(false) => buf.push(tags::FALSE),
        Value::Int(int) => {
            buf.push(tags::INT);
            let (sign, magnitude) = int.to_bytes_be();
            let (flag, magnitude) = match sign {
                Sign::Minus => (SIGN_NEGATIVE, magnitude.as_slice()),
                Sign::Plus => (SIGN_NON_NEGATIVE, magnitude.as_slice()),
                // zero has an empty magnitude
                Sign::NoSign => (SIGN_NON_NEGATIVE, &[][..]),
            };
            buf.push(flag);
            write_len(buf, "integer magnitude", magnitude.len())?;
            buf.extend_from_slice(magnitude);
        }
        Value::Float(x) => {
            buf.push(tags::FLOAT);
            buf.extend_from_slice(&x.to_bits().to_be_bytes());
        }
        Value::Complex(c) => {
            buf.push(tags::COMPLEX);
            buf.extend_from_slice(&c.re.to_bits().to_be_bytes());
            buf.extend_from_slice(&c.im.to_bits().to_be_bytes());
        }
        Value::Str(s) => {
            buf.push(tags::STR);
            write_str(buf, "string", s)?;
        }
        Value::Bytes(b) => {
            buf.push(tags::BYTES);
            write_len(buf, "bytes", b.len())?;
            buf.extend_from_slice(b);
        }
        Value::Sequence(items) => {
            buf.push(tags::SEQUENCE);
            write_len(buf, "sequence", items.len())?;
            for item in items {
                write_value(buf, item, depth + 1)?;
            }
        }
        Value::NamedSequence(record) => {
            buf.push(tags::NAMED_SEQUENCE);
            write_str(buf, "record name", record.name())?;
            write_len(buf, "record", record.entries().len())?;
            for (field, _) in record.entries() {
                write_str(buf, "field name", field)?;
            }
            for (_, item) in record.entries() {
                write_value(buf, item, depth + 1)?;
            }
        }
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, item) in map {
                let mut key_bytes = Vec::new();
                write_value(&mut key_bytes, key, depth + 1)?;
                entries.push((key_bytes, item));
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            buf.push(tags::MAPPING);
            write_len(buf, "mapping", entries.len())?;
            for (key_bytes, item) in entries {
                buf.extend_from_slice(&key_bytes);
                write_value(buf, item, depth + 1)?;
            }
        }
        Value::Array(array) => {
            let blob = array.to_blob();
            buf.push(tags::ARRAY);
            write_len(buf, "array blob", blob.len())?;
            buf.extend_from_slice(&blob);
        }
        Value::Object(frame) => write_frame(buf, tags::OBJECT, frame, depth)?,
        Value::KeyedObject(frame) => write_frame(buf, tags::KEYED_OBJECT, frame, depth)?,
    }
    Ok(())
}
