//! Store file layout.
//!
//! ```text
//! store:  "FPC1" version:u8 frame*
//! frame:  kind:u8 len:u32be [key:32 if entry] body:len
//! ```
//!
//! Entry frames carry the 32-byte cache key in a fixed slot, so `len` counts
//! only the result footprint. Frames of any other kind carry `len` opaque
//! bytes and are skipped by readers.

use crate::errors::CacheError;

/// Store file magic bytes.
pub const MAGIC: &[u8; 4] = b"FPC1";

/// Current store format version.
pub const VERSION: u8 = 1;

/// Store header size: magic plus version byte.
pub const HEADER_SIZE: usize = MAGIC.len() + 1;

/// Frame header size: kind byte plus body length.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Length of the cache key stored with every entry.
pub const KEY_SIZE: usize = 32;

/// Largest body a single frame may declare: 64 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Kind byte of entry frames.
pub const FRAME_KIND_ENTRY: u8 = 0x01;

/// Bytes every store starts with.
pub fn header() -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[..MAGIC.len()].copy_from_slice(MAGIC);
    bytes[MAGIC.len()] = VERSION;
    bytes
}

/// Checks magic and version at the start of `bytes`.
pub fn check_header(bytes: &[u8]) -> Result<(), CacheError> {
    let Some(found) = bytes.get(..HEADER_SIZE) else {
        return Err(CacheError::InvalidHeader(format!(
            "header too short: {} bytes",
            bytes.len()
        )));
    };
    if &found[..MAGIC.len()] != MAGIC {
        return Err(CacheError::InvalidHeader(format!(
            "invalid magic {:02x?}",
            &found[..MAGIC.len()]
        )));
    }
    let version = found[MAGIC.len()];
    if version != VERSION {
        return Err(CacheError::InvalidHeader(format!(
            "unsupported version {version}, expected {VERSION}"
        )));
    }
    Ok(())
}

/// Record frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Cached entry: key followed by the result footprint.
    Entry,
    /// Kind this version does not know; skipped by readers.
    Unknown(u8),
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            FRAME_KIND_ENTRY => FrameKind::Entry,
            other => FrameKind::Unknown(other),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Entry => FRAME_KIND_ENTRY,
            FrameKind::Unknown(byte) => byte,
        }
    }
}

impl FrameKind {
    /// Fixed bytes between the frame header and the counted body.
    pub fn fixed_len(self) -> usize {
        match self {
            FrameKind::Entry => KEY_SIZE,
            FrameKind::Unknown(_) => 0,
        }
    }
}

/// Kind and body length of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind.
    pub kind: FrameKind,
    /// Body length, excluding the fixed part.
    pub len: u32,
}

impl FrameHeader {
    /// Header for a frame whose body is `len` bytes.
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, CacheError> {
        let len = u32::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_PAYLOAD_SIZE)
            .ok_or(CacheError::PayloadTooLarge {
                size: len as u64,
                max: MAX_PAYLOAD_SIZE,
            })?;
        Ok(Self { kind, len })
    }

    /// Wire form of the header.
    pub fn to_bytes(self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.into();
        bytes[1..].copy_from_slice(&self.len.to_be_bytes());
        bytes
    }

    /// Parses a header read at `offset`.
    pub fn parse(bytes: [u8; FRAME_HEADER_SIZE], offset: u64) -> Result<Self, CacheError> {
        let len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(CacheError::InvalidFrame {
                offset,
                reason: format!("body of {len} bytes exceeds maximum {MAX_PAYLOAD_SIZE}"),
            });
        }
        Ok(Self {
            kind: FrameKind::from(bytes[0]),
            len,
        })
    }

    /// Bytes following the header: fixed part plus body.
    pub fn content_len(self) -> usize {
        self.kind.fixed_len() + self.len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_magic_and_version() {
        assert_eq!(&header(), b"FPC1\x01");
        check_header(&header()).unwrap();
    }

    #[test]
    fn foreign_headers_are_rejected() {
        assert!(check_header(b"FPC").is_err());
        assert!(check_header(b"JRNL\x01").is_err());
        let err = check_header(b"FPC1\x02").unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn frame_header_is_kind_then_big_endian_length() {
        let header = FrameHeader::new(FrameKind::Entry, 258).unwrap();
        assert_eq!(header.to_bytes(), [0x01, 0, 0, 1, 2]);
        assert_eq!(FrameHeader::parse(header.to_bytes(), 5).unwrap(), header);
    }

    #[test]
    fn entries_reserve_room_for_the_key() {
        let entry = FrameHeader::new(FrameKind::Entry, 2).unwrap();
        assert_eq!(entry.content_len(), KEY_SIZE + 2);
        let other = FrameHeader::new(FrameKind::Unknown(0x7F), 2).unwrap();
        assert_eq!(other.content_len(), 2);
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let err = FrameHeader::new(FrameKind::Entry, MAX_PAYLOAD_SIZE as usize + 1).unwrap_err();
        assert!(matches!(err, CacheError::PayloadTooLarge { .. }));

        let mut bytes = [0x01, 0, 0, 0, 0];
        bytes[1..].copy_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        let err = FrameHeader::parse(bytes, 40).unwrap_err();
        assert!(matches!(err, CacheError::InvalidFrame { offset: 40, .. }));
    }

    #[test]
    fn unknown_kinds_keep_their_byte() {
        assert_eq!(u8::from(FrameKind::from(0xFF)), 0xFF);
        assert_eq!(FrameKind::from(FRAME_KIND_ENTRY), FrameKind::Entry);
    }
}
