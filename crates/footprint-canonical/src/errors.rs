use thiserror::Error;

use crate::array::ArrayError;
use crate::value::TypePath;

/// Errors raised while resolving or encoding a value.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The input matches no builtin shape and exposes neither protocol.
    #[error("unsupported type for footprint: {0}")]
    UnsupportedType(&'static str),
    /// The input refers back to a value that is still being resolved.
    #[error("cyclic reference detected at {0}")]
    CyclicReference(&'static str),
    /// The input nests deeper than the decoder would accept.
    #[error("nesting deeper than {limit}")]
    TooDeep {
        /// The enforced limit.
        limit: usize,
    },
    /// Two distinct mapping keys resolved to the same value.
    #[error("duplicate mapping key after resolution: {0}")]
    DuplicateKey(String),
    /// A `RefCell` was mutably borrowed while being resolved.
    #[error("{0} is mutably borrowed")]
    Borrowed(&'static str),
    /// A length or count does not fit the `u32` framing.
    #[error("{what} length {len} exceeds u32 framing")]
    LengthOverflow {
        /// What was being framed.
        what: &'static str,
        /// Offending length.
        len: usize,
    },
    /// The array sub-codec rejected the input.
    #[error("array sub-codec failed: {0}")]
    Array(#[from] ArrayError),
}

/// Errors raised while decoding a footprint.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Leading version byte is not one this implementation reads.
    #[error("unsupported format version 0x{found:02x}, expected 0x{expected:02x}")]
    UnsupportedVersion {
        /// Version byte found in the stream.
        found: u8,
        /// Version this implementation writes.
        expected: u8,
    },
    /// Truncated, trailing, or otherwise non-canonical bytes.
    #[error("malformed encoding at offset {offset}: {reason}")]
    Malformed {
        /// Byte offset (version byte included) where parsing failed.
        offset: usize,
        /// What was wrong.
        reason: String,
    },
    /// An `Object` frame names a type missing from the registry.
    #[error("no reconstructor registered for {0}")]
    UnknownType(TypePath),
    /// A reconstructor rejected its state payload.
    #[error("cannot reconstruct {path}: {reason}")]
    State {
        /// Type being reconstructed.
        path: TypePath,
        /// Why the state was rejected.
        reason: String,
    },
    /// A decoded value does not have the shape the caller asked for.
    #[error("unexpected value: {0}")]
    Extract(String),
}
