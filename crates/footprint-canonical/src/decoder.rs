//! Footprint decoder.
//!
//! Decoding is strict: only byte sequences the encoder could have produced
//! are accepted. Truncation, trailing bytes, non-minimal integers, unsorted or
//! duplicate mapping keys and unknown tags are all
//! [`DecodeError::Malformed`].

use std::any::Any;
use std::collections::BTreeMap;

use num_bigint::{BigInt, Sign};
use tracing::debug;

use crate::array::NdArray;
use crate::encoder::{tags, FORMAT_VERSION, MAX_DEPTH, SIGN_NEGATIVE, SIGN_NON_NEGATIVE};
use crate::errors::DecodeError;
use crate::registry::Registry;
use crate::value::{Complex, NamedSequence, ObjectFrame, TypePath, Value};

/// Result of [`decode`]: plain values, plus live instances wherever the
/// stream held an `Object` frame.
#[derive(Debug)]
pub enum Decoded {
    /// Leaf value, array, or keyed object frame (always literal).
    Value(Value),
    /// Ordered children.
    Sequence(Vec<Decoded>),
    /// Named record with decoded field values.
    NamedSequence {
        /// Record type name.
        name: String,
        /// Fields in encoded order.
        entries: Vec<(String, Decoded)>,
    },
    /// Entries in encoded (sorted) key order. Keys stay literal values.
    Mapping(Vec<(Value, Decoded)>),
    /// Instance rebuilt by the registry.
    Object {
        /// Type the instance was rebuilt as.
        path: TypePath,
        /// The instance.
        instance: Box<dyn Any>,
    },
}

impl Decoded {
    /// Converts back into a plain value. Fails (returning `self`) when the
    /// tree holds a reconstructed instance.
    pub fn into_value(self) -> Result<Value, Decoded> {
        match self {
            Decoded::Value(value) => Ok(value),
            Decoded::Sequence(items) => {
                if items.iter().any(Decoded::has_object) {
                    return Err(Decoded::Sequence(items));
                }
                Ok(Value::Sequence(
                    items.into_iter().filter_map(|item| item.into_value().ok()).collect(),
                ))
            }
            Decoded::NamedSequence { name, entries } => {
                if entries.iter().any(|(_, item)| item.has_object()) {
                    return Err(Decoded::NamedSequence { name, entries });
                }
                let record = entries
                    .into_iter()
                    .filter_map(|(field, item)| item.into_value().ok().map(|v| (field, v)))
                    .fold(NamedSequence::new(name), |record, (field, v)| {
                        record.field(field, v)
                    });
                Ok(Value::NamedSequence(record))
            }
            Decoded::Mapping(entries) => {
                if entries.iter().any(|(_, item)| item.has_object()) {
                    return Err(Decoded::Mapping(entries));
                }
                Ok(Value::Mapping(
                    entries
                        .into_iter()
                        .filter_map(|(key, item)| item.into_value().ok().map(|v| (key, v)))
                        .collect(),
                ))
            }
            object @ Decoded::Object { .. } => Err(object),
        }
    }

    fn has_object(&self) -> bool {
        match self {
            Decoded::Value(_) => false,
            Decoded::Sequence(items) => items.iter().any(Decoded::has_object),
            Decoded::NamedSequence { entries, .. } => {
                entries.iter().any(|(_, item)| item.has_object())
            }
            Decoded::Mapping(entries) => entries.iter().any(|(_, item)| item.has_object()),
            Decoded::Object { .. } => true,
        }
    }

    /// Borrows the reconstructed instance if this is an object of type `T`.
    pub fn as_object<T: 'static>(&self) -> Option<&T> {
        match self {
            Decoded::Object { instance, .. } => instance.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Takes the reconstructed instance if this is an object of type `T`.
    pub fn into_object<T: 'static>(self) -> Result<T, Decoded> {
        match self {
            Decoded::Object { path, instance } => match instance.downcast::<T>() {
                Ok(instance) => Ok(*instance),
                Err(instance) => Err(Decoded::Object { path, instance }),
            },
            other => Err(other),
        }
    }
}

/// Decodes a footprint into a value without consulting any registry.
///
/// `Object` and `KeyedObject` frames come back literally.
pub fn decode_value(bytes: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::open(bytes)?;
    let value = reader.value(0)?;
    reader.finish()?;
    Ok(value)
}

/// Decodes a footprint, rebuilding `Object` frames through `registry`.
///
/// `KeyedObject` frames are never looked up: they decode to the literal
/// `(path, payload)` frame even when the registry knows the type.
///
/// # Errors
///
/// - [`DecodeError::UnsupportedVersion`] for an unknown leading version byte
/// - [`DecodeError::Malformed`] for truncated or non-canonical input
/// - [`DecodeError::UnknownType`] for an `Object` frame missing from `registry`
pub fn decode(bytes: &[u8], registry: &Registry) -> Result<Decoded, DecodeError> {
    let mut reader = Reader::open(bytes)?;
    let decoded = reader.decoded(registry, 0)?;
    reader.finish()?;
    Ok(decoded)
}

/// Decodes a footprint whose root is an `Object` frame of type `T`.
pub fn decode_as<T: 'static>(bytes: &[u8], registry: &Registry) -> Result<T, DecodeError> {
    match decode(bytes, registry)? {
        Decoded::Object { path, instance } => {
            instance
                .downcast::<T>()
                .map(|instance| *instance)
                .map_err(|_| DecodeError::State {
                    path,
                    reason: format!("reconstructor did not produce {}", std::any::type_name::<T>()),
                })
        }
        _ => Err(DecodeError::Extract("root is not an object".to_string())),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let Some(&version) = bytes.first() else {
            return Err(DecodeError::Malformed {
                offset: 0,
                reason: "missing format version".to_string(),
            });
        };
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(Self { bytes, pos: 1 })
    }

    fn finish(&self) -> Result<(), DecodeError> {
        if self.pos != self.bytes.len() {
            return Err(self.malformed(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )));
        }
        debug!(len = self.bytes.len(), "decoded footprint");
        Ok(())
    }

    fn malformed(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], DecodeError> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < n {
            return Err(self.malformed(format!(
                "truncated {what}: need {n} bytes, have {remaining}"
            )));
        }
        let bytes = self.bytes;
        let slice = &bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8, DecodeError> {
        Ok(self.take(1, what)?[0])
    }

    fn len(&mut self, what: &str) -> Result<usize, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, what)?);
        usize::try_from(u32::from_be_bytes(raw))
            .map_err(|_| self.malformed(format!("{what} length exceeds platform capacity")))
    }

    fn f64(&mut self, what: &str) -> Result<f64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, what)?);
        Ok(f64::from_bits(u64::from_be_bytes(raw)))
    }

    fn string(&mut self, what: &str) -> Result<String, DecodeError> {
        let len = self.len(what)?;
        let start = self.pos;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|e| DecodeError::Malformed {
            offset: start,
            reason: format!("invalid UTF-8 in {what}: {e}"),
        })
    }

    fn peek_tag(&self) -> Result<u8, DecodeError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.malformed("truncated value: missing tag"))
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_DEPTH {
            return Err(self.malformed(format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn int(&mut self) -> Result<BigInt, DecodeError> {
        let flag_at = self.pos;
        let flag = self.u8("integer sign")?;
        let len = self.len("integer magnitude")?;
        let magnitude = self.take(len, "integer magnitude")?;
        if magnitude.first() == Some(&0) {
            return Err(DecodeError::Malformed {
                offset: flag_at,
                reason: "integer magnitude has a leading zero byte".to_string(),
            });
        }
        let sign = match (flag, magnitude.is_empty()) {
            (SIGN_NON_NEGATIVE, true) => return Ok(BigInt::default()),
            (SIGN_NON_NEGATIVE, false) => Sign::Plus,
            (SIGN_NEGATIVE, false) => Sign::Minus,
            (SIGN_NEGATIVE, true) => {
                return Err(DecodeError::Malformed {
                    offset: flag_at,
                    reason: "negative zero integer".to_string(),
                })
            }
            (other, _) => {
                return Err(DecodeError::Malformed {
                    offset: flag_at,
                    reason: format!("invalid integer sign flag 0x{other:02x}"),
                })
            }
        };
        Ok(BigInt::from_bytes_be(sign, magnitude))
    }

    fn frame_path(&mut self) -> Result<TypePath, DecodeError> {
        let module = self.string("module name")?;
        let name = self.string("type name")?;
        Ok(TypePath::new(module, name))
    }

    /// Reads one mapping key, checking it sorts strictly after the previous one.
    fn mapping_key(
        &mut self,
        previous: &mut Option<&'a [u8]>,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let start = self.pos;
        let key = self.value(depth)?;
        let bytes = self.bytes;
        let key_bytes = &bytes[start..self.pos];
        if let Some(prev) = previous {
            if key_bytes <= *prev {
                return Err(DecodeError::Malformed {
                    offset: start,
                    reason: "mapping keys are not in canonical order".to_string(),
                });
            }
        }
        *previous = Some(key_bytes);
        Ok(key)
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        self.check_depth(depth)?;
        let tag_at = self.pos;
        let tag = self.u8("tag")?;
        let value = match tag {
            tags::NULL => Value::Null,
            tags::TRUE => Value::Bool(true),
            tags::FALSE => Value::Bool(false),
            tags::INT => Value::Int(self.int()?),
            tags::FLOAT => Value::Float(self.f64("float")?),
            tags::COMPLEX => {
                let re = self.f64("complex real part")?;
                let im = self.f64("complex imaginary part")?;
                Value::Complex(Complex::new(re, im))
            }
            tags::STR => Value::Str(self.string("string")?),
            tags::BYTES => {
                let len = self.len("bytes")?;
                Value::Bytes(self.take(len, "bytes")?.to_vec())
            }
            tags::SEQUENCE => {
                let count = self.len("sequence")?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                Value::Sequence(items)
            }
            tags::NAMED_SEQUENCE => {
                let name = self.string("record name")?;
                let fields = self.field_names()?;
                let mut record = NamedSequence::new(name);
                for field in fields {
                    record = record.field(field, self.value(depth + 1)?);
                }
                Value::NamedSequence(record)
            }
            tags::MAPPING => {
                let count = self.len("mapping")?;
                let mut map = BTreeMap::new();
                let mut previous = None;
                for _ in 0..count {
                    let key = self.mapping_key(&mut previous, depth + 1)?;
                    map.insert(key, self.value(depth + 1)?);
                }
                Value::Mapping(map)
            }
            tags::ARRAY => {
                let len = self.len("array blob")?;
                let start = self.pos;
                let blob = self.take(len, "array blob")?;
                let array = NdArray::from_blob(blob).map_err(|e| DecodeError::Malformed {
                    offset: start,
                    reason: e.to_string(),
                })?;
                Value::Array(array)
            }
            tags::OBJECT => {
                let path = self.frame_path()?;
                Value::Object(ObjectFrame::new(path, self.value(depth + 1)?))
            }
            tags::KEYED_OBJECT => {
                let path = self.frame_path()?;
                Value::KeyedObject(ObjectFrame::new(path, self.value(depth + 1)?))
            }
            other => {
                return Err(DecodeError::Malformed {
                    offset: tag_at,
                    reason: format!("unknown tag 0x{other:02x}"),
                })
            }
        };
        Ok(value)
    }

    fn field_names(&mut self) -> Result<Vec<String>, DecodeError> {
        let count = self.len("record")?;
        let mut fields = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            fields.push(self.string("field name")?);
        }
        Ok(fields)
    }

    /// Like [`Reader::value`], but rebuilds `Object` frames on the way.
    fn decoded(&mut self, registry: &Registry, depth: usize) -> Result<Decoded, DecodeError> {
        self.check_depth(depth)?;
        match self.peek_tag()? {
            tags::SEQUENCE => {
                self.pos += 1;
                let count = self.len("sequence")?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.decoded(registry, depth + 1)?);
                }
                Ok(Decoded::Sequence(items))
            }
            tags::NAMED_SEQUENCE => {
                self.pos += 1;
                let name = self.string("record name")?;
                let fields = self.field_names()?;
                let mut entries = Vec::with_capacity(fields.len());
                for field in fields {
                    entries.push((field, self.decoded(registry, depth + 1)?));
                }
                Ok(Decoded::NamedSequence { name, entries })
            }
            tags::MAPPING => {
                self.pos += 1;
                let count = self.len("mapping")?;
                let mut entries = Vec::with_capacity(count.min(1024));
                let mut previous = None;
                for _ in 0..count {
                    let key = self.mapping_key(&mut previous, depth + 1)?;
                    entries.push((key, self.decoded(registry, depth + 1)?));
                }
                Ok(Decoded::Mapping(entries))
            }
            tags::OBJECT => {
                self.pos += 1;
                let path = self.frame_path()?;
                let state = self.value(depth + 1)?;
                let instance = registry.reconstruct_frame(ObjectFrame::new(path.clone(), state))?;
                Ok(Decoded::Object { path, instance })
            }
            _ => Ok(Decoded::Value(self.value(depth)?)),
        }
    }
}
