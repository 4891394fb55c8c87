//! Store reader implementation.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;
use crate::frame::{self, FrameHeader, FrameKind, FRAME_HEADER_SIZE, HEADER_SIZE, KEY_SIZE};

/// Read mode for handling truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Strict mode: truncated frames are errors.
    Strict,
    /// Permissive mode: truncation is treated as end-of-file.
    #[default]
    Permissive,
}

/// One stored entry: the cache key and the footprint of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// SHA-256 of the encoded call arguments.
    pub key: [u8; KEY_SIZE],
    /// Footprint of the cached result.
    pub footprint: Vec<u8>,
}

/// Sequential reader over a store file.
///
/// ```rust,no_run
/// use footprint_cache::{ReadMode, StoreReader};
///
/// let mut reader = StoreReader::open(".cache/demo.square.fpc", ReadMode::Strict)?;
/// while let Some(record) = reader.read_record()? {
///     println!("{} bytes", record.footprint.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct StoreReader {
    file: File,
    mode: ReadMode,
    position: u64,
}

impl StoreReader {
    /// Opens a store file, validating its header.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file cannot be opened or its header is
    /// invalid.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, CacheError> {
        let mut file = File::open(path)?;
        Self::read_header(&mut file)?;
        Ok(Self {
            file,
            mode,
            position: HEADER_SIZE as u64,
        })
    }

    /// Offset just past the last complete frame read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_header(file: &mut File) -> Result<(), CacheError> {
        file.seek(io::SeekFrom::Start(0))?;
        let mut header_bytes = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header_bytes) {
            Ok(()) => frame::check_header(&header_bytes),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CacheError::InvalidHeader(
                "file shorter than store header".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn truncated(&self, offset: u64) -> Result<Option<(FrameKind, Vec<u8>)>, CacheError> {
        match self.mode {
            ReadMode::Permissive => Ok(None),
            ReadMode::Strict => Err(CacheError::TruncatedFrame { offset }),
        }
    }

    /// Reads the next frame, returning its kind and everything after the
    /// frame header (for entries, the key followed by the footprint).
    ///
    /// Returns `Ok(None)` at end-of-file (or at a truncated tail in permissive
    /// mode). The position only advances past complete frames.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, CacheError> {
        self.file.seek(io::SeekFrom::Start(self.position))?;

        let file_size = self.file.metadata()?.len();
        if self.position >= file_size {
            return Ok(None);
        }

        let mut frame_header_bytes = [0u8; FRAME_HEADER_SIZE];
        match self.file.read_exact(&mut frame_header_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return self.truncated(self.position)
            }
            Err(e) => return Err(e.into()),
        }
        let header = FrameHeader::parse(frame_header_bytes, self.position)?;

        let mut payload = vec![0u8; header.content_len()];
        match self.file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return self.truncated(self.position + FRAME_HEADER_SIZE as u64)
            }
            Err(e) => return Err(e.into()),
        }

        self.position += (FRAME_HEADER_SIZE + header.content_len()) as u64;
        Ok(Some((header.kind, payload)))
    }

    /// Reads the next entry, skipping unknown frame kinds.
    pub fn read_record(&mut self) -> Result<Option<Record>, CacheError> {
        loop {
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::Entry, mut payload)) => {
                    let footprint = payload.split_off(KEY_SIZE);
                    let mut key = [0u8; KEY_SIZE];
                    key.copy_from_slice(&payload);
                    return Ok(Some(Record { key, footprint }));
                }
                Some((FrameKind::Unknown(_), _)) => continue,
            }
        }
    }
}
