//! Slot table management.
//!
//! The slot table sits at the very start of the container: a `u32` slot
//! count followed by that many `u32` slot words. A zero word marks a free
//! slot, anything else is the absolute offset of an entry header.
//!
//! [`SlotIndex`] mirrors the table in memory and owns the free-slot pool.
//! The pool is a stack; a freshly created or loaded table is seeded so that
//! slots are handed out in ascending order, and a released slot is the next
//! one reused.

use crate::{FtlDatError, Result};
use binrw::{BinReaderExt, BinWriterExt};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Range;
use tracing::debug;

/// Size of the slot count field at file start.
pub const INDEX_HEADER_SIZE: u64 = 4;

/// Size of one slot word.
pub const SLOT_SIZE: u64 = 4;

/// Byte offset just past a table of `slot_count` slots.
pub const fn table_end_for(slot_count: u64) -> u64 {
    INDEX_HEADER_SIZE + SLOT_SIZE * slot_count
}

/// Byte offset of slot word `slot`.
pub const fn slot_position(slot: usize) -> u64 {
    INDEX_HEADER_SIZE + SLOT_SIZE * slot as u64
}

/// In-memory slot table with its free-slot pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    /// Slot words; 0 = free
    slots: Vec<u32>,
    /// Free slot numbers, next to hand out on top
    free: Vec<usize>,
}

impl SlotIndex {
    /// A table of `slot_count` free slots.
    pub fn with_capacity(slot_count: u32) -> Self {
        let slot_count = slot_count as usize;
        Self {
            slots: vec![0; slot_count],
            free: (0..slot_count).rev().collect(),
        }
    }

    /// A fully occupied table holding `offsets` in slot order.
    ///
    /// Used after repacking, when no slack remains.
    pub fn from_offsets(offsets: Vec<u32>) -> Self {
        Self {
            slots: offsets,
            free: Vec::new(),
        }
    }

    /// Read the slot count and table from the start of `reader`.
    ///
    /// A table that claims more slots than the file can hold is
    /// [`FtlDatError::CorruptIndex`].
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let slot_count: u32 = reader.read_le()?;

        let table_end = table_end_for(u64::from(slot_count));
        if table_end > file_len {
            return Err(FtlDatError::CorruptIndex(format!(
                "slot table of {slot_count} slots ends at {table_end} past end of file {file_len}"
            )));
        }

        let mut slots = Vec::with_capacity(slot_count as usize);
        for slot in 0..slot_count {
            let offset: u32 = reader.read_le().map_err(|e: binrw::Error| {
                FtlDatError::CorruptIndex(format!("slot {slot} unreadable: {e}"))
            })?;
            slots.push(offset);
        }

        let free = slots
            .iter()
            .enumerate()
            .rev()
            .filter(|&(_, &offset)| offset == 0)
            .map(|(slot, _)| slot)
            .collect();

        Ok(Self { slots, free })
    }

    /// Write the slot count and every slot word.
    pub fn write_table<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_le(&self.slot_count())?;
        writer.write_le(&self.slots)?;
        Ok(())
    }

    /// Write only the slot count field.
    pub fn write_header<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_le(&self.slot_count())?;
        Ok(())
    }

    /// Write the single slot word for `slot`.
    pub fn write_slot<W: Write + Seek>(&self, writer: &mut W, slot: usize) -> Result<()> {
        writer.seek(SeekFrom::Start(slot_position(slot)))?;
        writer.write_le(&self.slots[slot])?;
        Ok(())
    }

    /// Write zeroed words for `slots`.
    pub fn write_free_range<W: Write + Seek>(&self, writer: &mut W, slots: Range<usize>) -> Result<()> {
        writer.seek(SeekFrom::Start(slot_position(slots.start)))?;
        writer.write_all(&vec![0u8; slots.len() * SLOT_SIZE as usize])?;
        Ok(())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot count as stored on disk.
    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Offset just past the table.
    pub fn table_end(&self) -> u64 {
        table_end_for(self.slots.len() as u64)
    }

    /// Entry header offset held by `slot`, if occupied.
    pub fn offset(&self, slot: usize) -> Option<u64> {
        match self.slots.get(slot) {
            Some(&offset) if offset != 0 => Some(u64::from(offset)),
            _ => None,
        }
    }

    /// Occupied slots and their header offsets, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|&(_, &offset)| offset != 0)
            .map(|(slot, &offset)| (slot, u64::from(offset)))
    }

    /// Occupied slot with the lowest header offset.
    pub fn lowest_occupied(&self) -> Option<(usize, u64)> {
        self.occupied().min_by_key(|&(_, offset)| offset)
    }

    /// Number of slots available to [`claim`](Self::claim).
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Take the next free slot.
    pub fn claim(&mut self) -> Option<usize> {
        self.free.pop()
    }

    /// Point `slot` at the entry header at `offset`.
    pub fn set(&mut self, slot: usize, offset: u64) -> Result<()> {
        let word = u32::try_from(offset).map_err(|_| FtlDatError::OffsetOverflow(offset))?;
        self.slots[slot] = word;
        Ok(())
    }

    /// Clear `slot` and return it to the pool.
    pub fn release(&mut self, slot: usize) {
        self.slots[slot] = 0;
        self.free.push(slot);
    }

    /// Append `amount` free slots and return their numbers.
    ///
    /// The new slots are handed out lowest first.
    pub fn extend(&mut self, amount: usize) -> Range<usize> {
        let start = self.slots.len();
        let end = start + amount;
        self.slots.resize(end, 0);
        self.free.extend((start..end).rev());
        debug!("slot table extended from {} to {} slots", start, end);
        start..end
    }
}
