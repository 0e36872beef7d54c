//! Entry header codec.
//!
//! Every entry starts with an 8-byte fixed part followed by its name:
//!
//! | Offset | Size       | Field                     |
//! |--------|------------|---------------------------|
//! | 0x00   | 4          | Payload size (LE)         |
//! | 0x04   | 4          | Name length (LE)          |
//! | 0x08   | `name_len` | Name bytes                |
//!
//! The payload follows the name directly.

use crate::{FtlDatError, Result};
use binrw::{BinRead, BinWrite};
use std::io::{Read, Seek, SeekFrom, Write};

/// Size of the fixed part of an entry header (size + name length).
pub const ENTRY_FIXED_SIZE: u64 = 8;

/// On-disk entry header.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct EntryHeader {
    /// Payload length in bytes
    pub size: u32,
    /// Length of `name` in bytes
    pub name_len: u32,
    /// Entry name, `/`-separated by convention
    #[br(count = name_len)]
    pub name: Vec<u8>,
}

impl EntryHeader {
    /// Build a header for `name` carrying `size` payload bytes.
    pub fn new(name: &[u8], size: u64) -> Result<Self> {
        let size = u32::try_from(size).map_err(|_| FtlDatError::EntryTooLarge(size))?;
        let name_len = u32::try_from(name.len())
            .map_err(|_| FtlDatError::InvalidName("name exceeds 4 GiB".to_string()))?;
        Ok(Self {
            size,
            name_len,
            name: name.to_vec(),
        })
    }

    /// Read the header stored at `offset`.
    pub fn read_at<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;
        Ok(Self::read(reader)?)
    }

    /// Write the header at `offset`, leaving the cursor at the payload.
    pub fn write_at<W: Write + Seek>(&self, writer: &mut W, offset: u64) -> Result<()> {
        writer.seek(SeekFrom::Start(offset))?;
        self.write(writer)?;
        Ok(())
    }

    /// Header length including the name.
    pub fn header_len(&self) -> u64 {
        ENTRY_FIXED_SIZE + u64::from(self.name_len)
    }

    /// Header plus payload length.
    pub fn total_len(&self) -> u64 {
        self.header_len() + u64::from(self.size)
    }
}

/// In-memory view of one occupied slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Entry name
    pub name: Vec<u8>,
    /// Payload length
    pub size: u32,
    /// Absolute offset of the first payload byte
    pub payload_offset: u64,
}

impl EntryMeta {
    /// Metadata for an entry whose header sits at `header_offset`.
    pub fn at(name: Vec<u8>, size: u32, header_offset: u64) -> Self {
        let payload_offset = header_offset + ENTRY_FIXED_SIZE + name.len() as u64;
        Self {
            name,
            size,
            payload_offset,
        }
    }

    /// Absolute offset of the entry header.
    pub fn header_offset(&self) -> u64 {
        self.payload_offset - ENTRY_FIXED_SIZE - self.name.len() as u64
    }

    /// Header plus payload length.
    pub fn total_len(&self) -> u64 {
        ENTRY_FIXED_SIZE + self.name.len() as u64 + u64::from(self.size)
    }

    /// Exclusive end offset of the entry.
    pub fn end(&self) -> u64 {
        self.payload_offset + u64::from(self.size)
    }

    /// Move the entry so its header sits at `header_offset`.
    pub fn relocate(&mut self, header_offset: u64) {
        self.payload_offset = header_offset + ENTRY_FIXED_SIZE + self.name.len() as u64;
    }
}
