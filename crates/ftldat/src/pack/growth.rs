//! Slot table growth.
//!
//! The table never moves: it starts at offset 4 and can only be extended
//! into the bytes directly behind it. When an entry sits there, that entry
//! is copied to end-of-file and its slot repointed, which may free enough
//! room. Relocated entries always land past every byte the file held
//! before, so source and destination never overlap.

use super::DatPack;
use crate::backing::Backing;
use crate::index::{SLOT_SIZE, table_end_for};
use crate::{FtlDatError, Result};
use tracing::{debug, info};

impl<S: Backing> DatPack<S> {
    /// Make sure at least `amount` slots are free.
    ///
    /// Entries blocking the space behind the table are moved to the end of
    /// the file, lowest offset first, until the gap can hold the missing
    /// slots. Returns the number of slots added to the table.
    pub fn ensure_free_slots(&mut self, amount: usize) -> Result<usize> {
        let missing = amount.saturating_sub(self.index.free_count());
        if missing == 0 {
            return Ok(0);
        }

        let new_len = self.index.len() + missing;
        if u32::try_from(new_len).is_err() {
            return Err(FtlDatError::OffsetOverflow(table_end_for(new_len as u64)));
        }

        let mut relocated = 0usize;
        while let Some((slot, offset)) = self.index.lowest_occupied() {
            let available = offset.saturating_sub(self.index.table_end()) / SLOT_SIZE;
            if available >= missing as u64 {
                break;
            }
            self.relocate_to_eof(slot)?;
            relocated += 1;
        }

        let added = self.index.extend(missing);
        self.metadata.resize(self.index.len(), None);
        self.index.write_free_range(&mut self.stream, added)?;
        self.index.write_header(&mut self.stream)?;
        self.eof = self.eof.max(self.index.table_end());

        info!(
            "slot table grown by {} to {} slots ({} entries relocated)",
            missing,
            self.index.len(),
            relocated
        );
        Ok(missing)
    }

    /// Copy the entry in `slot` to end-of-file and repoint its slot.
    fn relocate_to_eof(&mut self, slot: usize) -> Result<()> {
        let meta = self.meta(slot)?;
        let old_offset = meta.header_offset();
        let len = meta.total_len();
        let new_offset = self.eof;

        if u32::try_from(new_offset).is_err() {
            return Err(FtlDatError::OffsetOverflow(new_offset));
        }

        self.copier
            .copy_within(&mut self.stream, old_offset, new_offset, len)?;
        self.index.set(slot, new_offset)?;
        self.index.write_slot(&mut self.stream, slot)?;

        if let Some(meta) = self.metadata[slot].as_mut() {
            meta.relocate(new_offset);
        }
        self.eof += len;

        debug!(
            "relocated slot {} ({} bytes) from {} to {}",
            slot, len, old_offset, new_offset
        );
        Ok(())
    }
}
