use footprint_canonical::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Arguments or a result could not be encoded.
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
    /// A stored result could not be decoded into the requested type.
    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),
    /// Invalid store header (magic or version).
    #[error("invalid cache store header: {0}")]
    InvalidHeader(String),
    /// Invalid frame structure (length out of range).
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Byte offset where the frame starts.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// Payload exceeds maximum size limit.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: u64,
        /// Maximum allowed size.
        max: u32,
    },
    /// Truncated frame detected in strict mode.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Byte offset where truncation occurred.
        offset: u64,
    },
    /// `CacheOnly` lookup for arguments that were never stored.
    #[error("no cached result for key {0}")]
    KeyNotFound(String),
    /// Cache configuration could not be parsed.
    #[error("invalid cache config: {0}")]
    Config(#[from] toml::de::Error),
}
