//! Repacking: rewrite the container into its minimal layout.
//!
//! The target layout has a slot table exactly as long as the number of live
//! entries, followed by the entries packed back to back in their current
//! physical order. Because the order is kept and the new table is never
//! longer than the old one, every entry's new offset is at or below its old
//! offset. Moving the entries lowest first, each with an ascending chunk
//! copy, therefore only ever overwrites bytes that were already copied or
//! are dead.

use super::DatPack;
use crate::backing::Backing;
use crate::entry::EntryMeta;
use crate::index::{SlotIndex, slot_position, table_end_for};
use crate::{FtlDatError, Result};
use binrw::BinWriterExt;
use std::collections::HashMap;
use std::io::SeekFrom;
use tracing::{debug, info};

/// Outcome of [`DatPack::repack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepackStats {
    /// File size before repacking
    pub old_size: u64,
    /// File size after repacking
    pub new_size: u64,
    /// Bytes written: table words plus relocated entry bytes
    pub bytes_moved: u64,
}

impl RepackStats {
    /// Bytes reclaimed by the repack.
    pub const fn bytes_saved(&self) -> u64 {
        self.old_size.saturating_sub(self.new_size)
    }
}

/// Planned position of one live entry.
#[derive(Debug)]
struct Placement {
    meta: EntryMeta,
    old_offset: u64,
    new_offset: u64,
}

/// Sort live entries by offset and reject overlapping byte ranges, or any
/// entry that runs past `file_len`.
fn sorted_live_entries(entries: &mut [EntryMeta], file_len: u64) -> Result<()> {
    entries.sort_by_key(EntryMeta::header_offset);

    if let Some(last) = entries.last()
        && last.end() > file_len
    {
        return Err(FtlDatError::CorruptIndex(format!(
            "entry at {} ends at {} past end of file {}",
            last.header_offset(),
            last.end(),
            file_len
        )));
    }

    for pair in entries.windows(2) {
        if pair[0].end() > pair[1].header_offset() {
            return Err(FtlDatError::OverlappingEntries {
                first_start: pair[0].header_offset(),
                first_end: pair[0].end(),
                second_start: pair[1].header_offset(),
            });
        }
    }
    Ok(())
}

/// Assign packed offsets behind a table of `entries.len()` slots.
fn plan_layout(entries: Vec<EntryMeta>) -> Result<(Vec<Placement>, u64)> {
    let mut cursor = table_end_for(entries.len() as u64);
    let mut plan = Vec::with_capacity(entries.len());

    for meta in entries {
        let old_offset = meta.header_offset();
        if cursor > old_offset {
            return Err(FtlDatError::RelocationOverlap {
                src: old_offset,
                dst: cursor,
                len: meta.total_len(),
            });
        }
        let len = meta.total_len();
        plan.push(Placement {
            meta,
            old_offset,
            new_offset: cursor,
        });
        cursor += len;
    }

    Ok((plan, cursor))
}

impl<S: Backing> DatPack<S> {
    /// Rewrite the container into its minimal layout and truncate it.
    ///
    /// Only slot words whose value changes are written, and only entries
    /// whose offset changes are moved, so repacking an already minimal file
    /// writes nothing. Fails with [`FtlDatError::OverlappingEntries`] before
    /// any write if two entries share bytes, and with
    /// [`FtlDatError::CorruptIndex`] if an entry runs past the end of file.
    pub fn repack(&mut self) -> Result<RepackStats> {
        let old_size = self.eof;

        let mut entries: Vec<EntryMeta> = self.metadata.iter().flatten().cloned().collect();
        sorted_live_entries(&mut entries, old_size)?;
        let (plan, new_size) = plan_layout(entries)?;

        let new_offsets = plan
            .iter()
            .map(|p| {
                u32::try_from(p.new_offset).map_err(|_| FtlDatError::OffsetOverflow(p.new_offset))
            })
            .collect::<Result<Vec<u32>>>()?;
        let packed = SlotIndex::from_offsets(new_offsets);

        let mut bytes_moved = 0u64;

        if packed.len() != self.index.len() {
            packed.write_header(&mut self.stream)?;
            bytes_moved += 4;
        }

        for (slot, placement) in plan.iter().enumerate() {
            if self.index.offset(slot) != Some(placement.new_offset) {
                self.stream.seek(SeekFrom::Start(slot_position(slot)))?;
                self.stream.write_le(&(placement.new_offset as u32))?;
                bytes_moved += 4;
            }
        }

        for placement in &plan {
            if placement.new_offset == placement.old_offset {
                continue;
            }
            let len = placement.meta.total_len();
            self.copier.copy_within(
                &mut self.stream,
                placement.old_offset,
                placement.new_offset,
                len,
            )?;
            bytes_moved += len;
            debug!(
                "moved {} ({} bytes) from {} to {}",
                String::from_utf8_lossy(&placement.meta.name),
                len,
                placement.old_offset,
                placement.new_offset
            );
        }

        self.stream.truncate(new_size)?;

        let mut names = HashMap::with_capacity(plan.len());
        let mut metadata = Vec::with_capacity(plan.len());
        for (slot, placement) in plan.into_iter().enumerate() {
            let mut meta = placement.meta;
            meta.relocate(placement.new_offset);
            names.insert(meta.name.clone(), slot);
            metadata.push(Some(meta));
        }
        self.index = packed;
        self.metadata = metadata;
        self.names = names;
        self.eof = new_size;

        let stats = RepackStats {
            old_size,
            new_size,
            bytes_moved,
        };
        info!(
            "repacked {} entries: {} -> {} bytes, {} bytes moved",
            self.names.len(),
            stats.old_size,
            stats.new_size,
            stats.bytes_moved
        );
        Ok(stats)
    }
}
