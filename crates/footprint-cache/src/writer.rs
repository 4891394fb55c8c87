//! Store writer implementation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use crate::errors::CacheError;
use crate::frame::{self, FrameHeader, FrameKind, FRAME_HEADER_SIZE, HEADER_SIZE, KEY_SIZE};

/// Options for store writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether to fsync after each append (default: false).
    pub sync: bool,
    /// Whether to keep existing entries (default: true). `false` empties the store.
    pub append: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            append: true,
        }
    }
}

/// Append-only writer for a store file.
///
/// New files get a header on open; existing files must already carry a valid
/// one.
pub struct StoreWriter {
    file: File,
    sync: bool,
}

impl StoreWriter {
    /// Opens or creates a store file for appending.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file cannot be opened or is not a valid
    /// store.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, CacheError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(path)?;

        let mut writer = Self {
            file,
            sync: options.sync,
        };

        let len = writer.file.metadata()?.len();
        if len == 0 {
            writer.write_header()?;
        } else if len < HEADER_SIZE as u64 {
            return Err(CacheError::InvalidHeader(
                "file shorter than store header".to_string(),
            ));
        } else {
            let mut header_bytes = [0u8; HEADER_SIZE];
            writer.file.seek(io::SeekFrom::Start(0))?;
            writer.file.read_exact(&mut header_bytes)?;
            frame::check_header(&header_bytes)?;
            if options.append {
                writer.file.seek(io::SeekFrom::End(0))?;
            } else {
                writer.truncate(HEADER_SIZE as u64)?;
            }
        }

        Ok(writer)
    }

    fn write_header(&mut self) -> Result<(), CacheError> {
        self.file.write_all(&frame::header())?;
        self.flush()
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Cuts the file back to `len` bytes and continues appending there.
    pub fn truncate(&mut self, len: u64) -> Result<(), CacheError> {
        self.file.set_len(len.max(HEADER_SIZE as u64))?;
        self.file.seek(io::SeekFrom::End(0))?;
        self.flush()
    }

    /// Appends one entry frame.
    pub fn append_entry(&mut self, key: &[u8; KEY_SIZE], footprint: &[u8]) -> Result<(), CacheError> {
        let header = FrameHeader::new(FrameKind::Entry, footprint.len())?;
        self.write_frame(header, &[key.as_slice(), footprint])
    }

    /// Appends a frame of any kind. `content` is everything after the frame
    /// header, so for entries it starts with the key.
    pub fn append_raw(&mut self, kind: FrameKind, content: &[u8]) -> Result<(), CacheError> {
        let Some(len) = content.len().checked_sub(kind.fixed_len()) else {
            return Err(CacheError::InvalidFrame {
                offset: self.file.stream_position()?,
                reason: format!(
                    "{} bytes cannot hold the {}-byte fixed part",
                    content.len(),
                    kind.fixed_len()
                ),
            });
        };
        let header = FrameHeader::new(kind, len)?;
        self.write_frame(header, &[content])
    }

    fn write_frame(&mut self, header: FrameHeader, parts: &[&[u8]]) -> Result<(), CacheError> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + header.content_len());
        buf.extend_from_slice(&header.to_bytes());
        for part in parts {
            buf.extend_from_slice(part);
        }
        self.file.write_all(&buf)?;
        self.flush()
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
        if self.sync {
            let _ = self.file.sync_all();
        }
    }
}
