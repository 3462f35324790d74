// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append-style binary archives.
//!
//! Every archive starts with [`ARCHIVE_VERSION`]. Fields are appended with
//! `bincode` one at a time and must be read back in the order they were
//! written; there is no field tagging.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Current archive format version, written first on every archive
pub const ARCHIVE_VERSION: u32 = 1;

/// Archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Field encoding or decoding failed
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Archive written by a newer editor
    #[error("Unsupported archive version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version found in the archive
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// A tag field held a value no reader knows
    #[error("Invalid {what} tag: {value}")]
    InvalidTag {
        /// Which tag was being decoded
        what: &'static str,
        /// The raw value
        value: u8,
    },
}

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Writes fields into an in-memory buffer, then persists it
#[derive(Debug)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
}

impl ArchiveWriter {
    /// Start an archive; the format version is written immediately
    pub fn new() -> Self {
        // bincode's default encoding of a u32
        Self {
            buffer: ARCHIVE_VERSION.to_le_bytes().to_vec(),
        }
    }

    /// Append one field
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        bincode::serialize_into(&mut self.buffer, value)?;
        Ok(())
    }

    /// Bytes written so far, version included
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether only the header has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.len() <= std::mem::size_of::<u32>()
    }

    /// Encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Write the archive to `path`, replacing any existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.buffer)?;
        Ok(())
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads fields back in write order
#[derive(Debug)]
pub struct ArchiveReader {
    data: Vec<u8>,
    offset: usize,
    version: u32,
}

impl ArchiveReader {
    /// Open an archive file and read its version
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Wrap encoded bytes and read the version
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut reader = Self {
            data,
            offset: 0,
            version: 0,
        };
        let version: u32 = reader.read()?;
        if version > ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion {
                found: version,
                supported: ARCHIVE_VERSION,
            });
        }
        reader.version = version;
        Ok(reader)
    }

    /// Format version the archive was written with
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Read the next field
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut remaining = &self.data[self.offset..];
        let value = bincode::deserialize_from(&mut remaining)?;
        self.offset = self.data.len() - remaining.len();
        Ok(value)
    }

    /// Whether every field has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.data.len()
    }
}
