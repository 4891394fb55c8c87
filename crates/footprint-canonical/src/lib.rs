//! Canonical binary footprints for structured values.
//!
//! Equal values always encode to identical bytes and different values never
//! do, so a footprint (or its SHA-256 digest) can key caches and stores.
//! Inputs are resolved into the closed [`Value`] model, encoded with explicit
//! type tags and big-endian `u32` framing, and decoded back strictly.
//!
#![deny(missing_docs)]

/// Array sub-codec for homogeneous numeric buffers.
pub mod array;
/// Strict decoder and registry-driven object reconstruction.
pub mod decoder;
/// SHA-256 helpers over footprints.
pub mod digest;
/// Canonical encoder and wire constants.
pub mod encoder;
/// Error types for encoding and decoding.
pub mod errors;
/// Typed extraction from decoded values.
pub mod extract;
/// Parameter objects keyed by their non-null fields.
pub mod parameter;
/// Type-path to reconstructor registry.
pub mod registry;
/// Capability resolution from Rust values to [`Value`].
pub mod resolver;
/// The closed value model.
pub mod value;

pub use array::{ArrayError, ByteOrder, DType, NdArray};
pub use decoder::{decode, decode_as, decode_value, Decoded};
pub use digest::{
    hash_bytes, hash_hex_from_bytes, hash_hex_from_object, hash_object, Digest, DigestAlg,
};
pub use encoder::{encode, encode_value, FORMAT_VERSION, MAX_DEPTH};
pub use errors::{DecodeError, EncodeError};
pub use extract::FromValue;
pub use parameter::{parameter_key, NonKey, Parameter, ParameterDisplay};
pub use registry::{Reconstruct, Reconstructor, Registry};
pub use resolver::{resolve, Encodable, KeyProtocol, Resolver, StateProtocol};
pub use value::{Bytes, Complex, NamedSequence, ObjectFrame, TypePath, Value};
