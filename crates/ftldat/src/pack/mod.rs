//! The `.dat` container engine.
//!
//! [`DatPack`] owns the backing file for its whole lifetime and keeps an
//! in-memory view of it: the slot table, per-slot entry metadata, a name to
//! slot map and the end-of-file cursor where the next entry is appended.
//!
//! Mutations issue targeted writes only. `add` writes one slot word, one
//! entry header and the payload; `remove` writes one zero slot word. The
//! space a removed entry occupied stays in the file until [`DatPack::repack`]
//! rewrites the layout.
//!
//! None of the mutating operations are atomic with respect to process
//! failure. Callers that need durability must snapshot the file first.

mod growth;
mod repack;

pub use repack::RepackStats;

use crate::backing::Backing;
use crate::config::PackConfig;
use crate::copy::ChunkCopier;
use crate::entry::{EntryHeader, EntryMeta};
use crate::index::SlotIndex;
use crate::{FtlDatError, Result};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// One occupied slot, as reported by [`DatPack::list_metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Slot number
    pub slot: usize,
    /// Entry name
    pub name: Vec<u8>,
    /// Payload size
    pub size: u32,
    /// Absolute payload offset
    pub offset: u64,
}

/// A `.dat` container open for reading and writing.
pub struct DatPack<S: Backing = File> {
    /// Backing storage, owned exclusively
    stream: S,
    /// Slot table and free-slot pool
    index: SlotIndex,
    /// Entry metadata per slot
    metadata: Vec<Option<EntryMeta>>,
    /// Name to slot lookup
    names: HashMap<Vec<u8>, usize>,
    /// Current file length; next entry goes here
    eof: u64,
    /// Shared copy buffer
    copier: ChunkCopier,
}

impl DatPack<File> {
    /// Create a new container at `path` with `index_size` free slots.
    ///
    /// An existing file at `path` is truncated.
    pub fn create(path: impl AsRef<Path>, index_size: u32) -> Result<Self> {
        Self::create_with_config(path, &PackConfig::new(index_size))
    }

    /// Create a new container at `path` using `config`.
    pub fn create_with_config(path: impl AsRef<Path>, config: &PackConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        debug!("creating container {}", path.display());
        Self::create_in(file, config)
    }

    /// Open an existing container at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &PackConfig::default())
    }

    /// Open an existing container at `path` using `config`.
    pub fn open_with_config(path: impl AsRef<Path>, config: &PackConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("opening container {}", path.display());
        Self::load(file, config)
    }
}

impl<S: Backing> DatPack<S> {
    /// Initialize `stream` as an empty container.
    ///
    /// Any previous content of `stream` is discarded.
    pub fn create_in(mut stream: S, config: &PackConfig) -> Result<Self> {
        config.validate()?;

        let index = SlotIndex::with_capacity(config.index_size);
        stream.truncate(0)?;
        index.write_table(&mut stream)?;
        let eof = index.table_end();

        Ok(Self {
            stream,
            metadata: vec![None; index.len()],
            index,
            names: HashMap::new(),
            eof,
            copier: ChunkCopier::new(config.chunk_size),
        })
    }

    /// Load the container stored in `stream`.
    ///
    /// Fails with [`FtlDatError::CorruptIndex`] if a slot points into the
    /// table or at an unreadable header, or if a name occurs twice.
    pub fn load(mut stream: S, config: &PackConfig) -> Result<Self> {
        config.validate()?;

        let index = SlotIndex::read(&mut stream)?;
        let eof = stream.seek(SeekFrom::End(0))?;
        let table_end = index.table_end();

        let mut metadata = vec![None; index.len()];
        let mut names = HashMap::new();

        for (slot, offset) in index.occupied() {
            if offset < table_end {
                return Err(FtlDatError::CorruptIndex(format!(
                    "slot {slot} points at {offset}, inside the {table_end}-byte slot table"
                )));
            }

            let header = EntryHeader::read_at(&mut stream, offset).map_err(|e| {
                FtlDatError::CorruptIndex(format!(
                    "slot {slot}: unreadable entry header at {offset}: {e}"
                ))
            })?;

            let meta = EntryMeta::at(header.name, header.size, offset);
            if meta.end() > eof {
                warn!(
                    "entry in slot {} ends at {} past end of file {}",
                    slot,
                    meta.end(),
                    eof
                );
            }

            if names.insert(meta.name.clone(), slot).is_some() {
                return Err(FtlDatError::CorruptIndex(format!(
                    "name {} occurs more than once",
                    String::from_utf8_lossy(&meta.name)
                )));
            }
            metadata[slot] = Some(meta);
        }

        info!(
            "loaded {} entries in {} slots ({} bytes)",
            names.len(),
            index.len(),
            eof
        );

        Ok(Self {
            stream,
            index,
            metadata,
            names,
            eof,
            copier: ChunkCopier::new(config.chunk_size),
        })
    }

    /// Names of all entries, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.names.keys().map(Vec::as_slice)
    }

    /// Names and payload sizes of all entries, in no particular order.
    pub fn list_sizes(&self) -> impl Iterator<Item = (&[u8], u32)> + '_ {
        self.metadata
            .iter()
            .flatten()
            .map(|meta| (meta.name.as_slice(), meta.size))
    }

    /// Slot, name, size and payload offset of every entry, in slot order.
    pub fn list_metadata(&self) -> Vec<EntryInfo> {
        self.metadata
            .iter()
            .enumerate()
            .filter_map(|(slot, meta)| {
                meta.as_ref().map(|meta| EntryInfo {
                    slot,
                    name: meta.name.clone(),
                    size: meta.size,
                    offset: meta.payload_offset,
                })
            })
            .collect()
    }

    /// Whether an entry named `name` exists.
    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        self.names.contains_key(name.as_ref())
    }

    /// Payload size of `name`, if present.
    pub fn entry_size(&self, name: impl AsRef<[u8]>) -> Option<u32> {
        self.lookup(name.as_ref()).map(|(_, meta)| meta.size)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slot capacity.
    pub fn index_size(&self) -> usize {
        self.index.len()
    }

    /// Slots available without growing the table.
    pub fn free_slots(&self) -> usize {
        self.index.free_count()
    }

    /// Current file length.
    pub const fn eof(&self) -> u64 {
        self.eof
    }

    /// Add `size` bytes read from `source` as a new entry called `name`.
    ///
    /// Grows the slot table first when no slot is free. Fails with
    /// [`FtlDatError::DuplicateKey`] before writing anything if the name is
    /// taken. If `source` runs dry early the call fails with
    /// [`FtlDatError::ShortRead`]. On that or any write error the slot is
    /// released again, but bytes already written stay behind as slack until
    /// the next repack.
    pub fn add<R>(&mut self, name: impl AsRef<[u8]>, source: &mut R, size: u64) -> Result<()>
    where
        R: Read + ?Sized,
    {
        let name = name.as_ref();
        if self.names.contains_key(name) {
            return Err(FtlDatError::DuplicateKey(name.to_vec()));
        }
        let header = EntryHeader::new(name, size)?;

        if self.index.free_count() == 0 {
            self.ensure_free_slots(1)?;
        }
        let slot = self.index.claim().ok_or_else(|| {
            FtlDatError::CorruptIndex("no free slot after growing the table".to_string())
        })?;

        let offset = self.eof;
        if let Err(e) = self.write_entry(slot, offset, &header, source, size) {
            self.abandon(slot);
            return Err(e);
        }

        let meta = EntryMeta::at(header.name, header.size, offset);
        self.eof += meta.total_len();
        debug!(
            "added {} ({} bytes) in slot {} at {}",
            String::from_utf8_lossy(&meta.name),
            size,
            slot,
            offset
        );
        self.names.insert(meta.name.clone(), slot);
        self.metadata[slot] = Some(meta);
        Ok(())
    }

    /// Stream the payload of `name` into `sink`.
    pub fn extract_to<W>(&mut self, name: impl AsRef<[u8]>, sink: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let name = name.as_ref();
        let (offset, size) = self
            .lookup(name)
            .map(|(_, meta)| (meta.payload_offset, u64::from(meta.size)))
            .ok_or_else(|| FtlDatError::NotFound(name.to_vec()))?;

        self.stream.seek(SeekFrom::Start(offset))?;
        self.copier
            .copy_exact(&mut self.stream, sink, size)
            .map_err(|e| match e {
                FtlDatError::ShortRead { expected, actual } => FtlDatError::CorruptIndex(format!(
                    "payload of {} truncated: {actual} of {expected} bytes present",
                    String::from_utf8_lossy(name)
                )),
                other => other,
            })
    }

    /// Remove `name`, freeing its slot.
    ///
    /// Only the slot word is cleared; the entry bytes remain in the file.
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Result<()> {
        let name = name.as_ref();
        let slot = *self
            .names
            .get(name)
            .ok_or_else(|| FtlDatError::NotFound(name.to_vec()))?;

        self.index.release(slot);
        self.index.write_slot(&mut self.stream, slot)?;
        self.metadata[slot] = None;
        self.names.remove(name);
        debug!("removed {} from slot {}", String::from_utf8_lossy(name), slot);
        Ok(())
    }

    /// Flush buffered writes to the backing storage.
    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }

    /// Borrow the backing storage.
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Give up the container and return its backing storage.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn lookup(&self, name: &[u8]) -> Option<(usize, &EntryMeta)> {
        let slot = *self.names.get(name)?;
        self.metadata[slot].as_ref().map(|meta| (slot, meta))
    }

    fn meta(&self, slot: usize) -> Result<&EntryMeta> {
        self.metadata
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| FtlDatError::CorruptIndex(format!("slot {slot} has no entry metadata")))
    }

    /// Point `slot` at `offset`, then write its word, the header and the payload.
    fn write_entry<R>(
        &mut self,
        slot: usize,
        offset: u64,
        header: &EntryHeader,
        source: &mut R,
        size: u64,
    ) -> Result<()>
    where
        R: Read + ?Sized,
    {
        self.index.set(slot, offset)?;
        self.index.write_slot(&mut self.stream, slot)?;
        header.write_at(&mut self.stream, offset)?;
        self.copier.copy_exact(source, &mut self.stream, size)
    }

    /// Undo the slot claim of a failed add and resync the EOF cursor.
    ///
    /// The add has already failed, so errors here are only logged.
    fn abandon(&mut self, slot: usize) {
        let before = self.eof;
        self.index.release(slot);
        if let Err(e) = self.index.write_slot(&mut self.stream, slot) {
            warn!("could not clear slot {} after failed add: {}", slot, e);
        }
        match self.stream.seek(SeekFrom::End(0)) {
            Ok(len) => self.eof = len,
            Err(e) => warn!("could not resync end of file after failed add: {}", e),
        }
        warn!(
            "add into slot {} aborted; {} bytes of slack left at end of file",
            slot,
            self.eof.saturating_sub(before)
        );
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn memory_pack(index_size: u32) -> DatPack<Cursor<Vec<u8>>> {
        DatPack::create_in(Cursor::new(Vec::new()), &PackConfig::new(index_size).with_chunk_size(5))
            .expect("create")
    }

    pub(crate) fn add_bytes<S: Backing>(pack: &mut DatPack<S>, name: &str, data: &[u8]) {
        pack.add(name, &mut Cursor::new(data), data.len() as u64)
            .expect("add");
    }

    pub(crate) fn extract<S: Backing>(pack: &mut DatPack<S>, name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        pack.extract_to(name, &mut out).expect("extract");
        out
    }

    pub(crate) fn reload(pack: DatPack<Cursor<Vec<u8>>>) -> DatPack<Cursor<Vec<u8>>> {
        DatPack::load(pack.into_inner(), &PackConfig::default()).expect("reload")
    }

    #[test]
    fn test_create_writes_zeroed_table() {
        let pack = memory_pack(2);
        assert_eq!(pack.get_ref().get_ref(), &[2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(pack.eof(), 12);
        assert_eq!(pack.free_slots(), 2);
        assert!(pack.is_empty());
    }

    #[test]
    fn test_add_layout_on_disk() {
        let mut pack = memory_pack(2);
        add_bytes(&mut pack, "a", b"xyz");

        let bytes = pack.get_ref().get_ref().clone();
        assert_eq!(&bytes[4..8], &12u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1u32.to_le_bytes());
        assert_eq!(&bytes[20..], b"axyz");
        assert_eq!(pack.eof(), 24);
    }

    #[test]
    fn test_add_extract_round_trip() {
        let mut pack = memory_pack(4);
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        add_bytes(&mut pack, "data/events.xml", &payload);
        add_bytes(&mut pack, "empty", b"");

        assert_eq!(extract(&mut pack, "data/events.xml"), payload);
        assert_eq!(extract(&mut pack, "empty"), b"");
        assert_eq!(pack.entry_size("data/events.xml"), Some(1000));
    }

    #[test]
    fn test_duplicate_add_changes_nothing() {
        let mut pack = memory_pack(2);
        add_bytes(&mut pack, "a", b"xyz");
        let before = pack.get_ref().get_ref().clone();

        let err = pack
            .add("a", &mut Cursor::new(b"other"), 5)
            .expect_err("duplicate");
        assert!(matches!(err, FtlDatError::DuplicateKey(_)));
        assert_eq!(pack.get_ref().get_ref(), &before);
        assert_eq!(pack.free_slots(), 1);
        assert_eq!(extract(&mut pack, "a"), b"xyz");
    }

    #[test]
    fn test_missing_names() {
        let mut pack = memory_pack(1);
        assert!(matches!(
            pack.extract_to("nope", &mut Vec::<u8>::new()),
            Err(FtlDatError::NotFound(_))
        ));
        assert!(matches!(pack.remove("nope"), Err(FtlDatError::NotFound(_))));
        assert!(!pack.contains("nope"));
    }

    #[test]
    fn test_remove_keeps_bytes_and_frees_slot() {
        let mut pack = memory_pack(2);
        add_bytes(&mut pack, "a", b"xyz");
        let eof = pack.eof();

        pack.remove("a").expect("remove");
        assert!(!pack.contains("a"));
        assert_eq!(pack.eof(), eof);
        assert_eq!(pack.get_ref().get_ref().len() as u64, eof);
        assert_eq!(&pack.get_ref().get_ref()[4..8], &[0, 0, 0, 0]);
        assert_eq!(pack.free_slots(), 2);
    }

    #[test]
    fn test_short_read_releases_slot() {
        let mut pack = memory_pack(2);
        let err = pack
            .add("partial", &mut Cursor::new(b"abc"), 10)
            .expect_err("short");
        assert!(matches!(
            err,
            FtlDatError::ShortRead {
                expected: 10,
                actual: 3
            }
        ));

        assert!(!pack.contains("partial"));
        assert_eq!(pack.free_slots(), 2);
        assert_eq!(pack.eof(), pack.get_ref().get_ref().len() as u64);
        assert_eq!(&pack.get_ref().get_ref()[4..8], &[0, 0, 0, 0]);

        // Next add lands after the slack and the file still loads.
        add_bytes(&mut pack, "b", b"hi");
        let mut pack = reload(pack);
        assert_eq!(extract(&mut pack, "b"), b"hi");
        assert_eq!(pack.len(), 1);
    }

    /// Cursor whose write calls start failing after `armed` more succeed.
    struct FailingBacking {
        inner: Cursor<Vec<u8>>,
        armed: Option<usize>,
    }

    impl Read for FailingBacking {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Write for FailingBacking {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match self.armed {
                Some(0) => {
                    self.armed = None;
                    Err(std::io::Error::other("disk full"))
                }
                Some(n) => {
                    self.armed = Some(n - 1);
                    self.inner.write(buf)
                }
                None => self.inner.write(buf),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl std::io::Seek for FailingBacking {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            std::io::Seek::seek(&mut self.inner, pos)
        }
    }

    impl Backing for FailingBacking {
        fn truncate(&mut self, len: u64) -> std::io::Result<()> {
            self.inner.truncate(len)
        }
    }

    #[test]
    fn test_failed_write_during_add_releases_slot() {
        // Fail the slot word, the header and the payload write in turn
        for armed in 0..3 {
            let backing = FailingBacking {
                inner: Cursor::new(Vec::new()),
                armed: None,
            };
            let config = PackConfig::new(2).with_chunk_size(5);
            let mut pack = DatPack::create_in(backing, &config).expect("create");
            add_bytes(&mut pack, "a", b"xyz");

            pack.stream.armed = Some(armed);
            let err = pack
                .add("b", &mut Cursor::new(b"bb"), 2)
                .expect_err("write fails");
            assert!(matches!(err, FtlDatError::Io(_)), "armed {armed}: {err:?}");
            assert_eq!(pack.free_slots(), 1, "armed {armed}");
            assert_eq!(pack.len(), 1);
            assert!(!pack.contains("b"));

            // The released slot is reused, then growth relocates "a"
            add_bytes(&mut pack, "c", b"cc");
            add_bytes(&mut pack, "d", b"dddd");

            let inner = pack.into_inner().inner;
            let mut pack = DatPack::load(inner, &PackConfig::default()).expect("reload");
            assert_eq!(pack.len(), 3);
            assert!(!pack.contains("b"));
            assert_eq!(extract(&mut pack, "a"), b"xyz");
            assert_eq!(extract(&mut pack, "c"), b"cc");
            assert_eq!(extract(&mut pack, "d"), b"dddd");
        }
    }

    #[test]
    fn test_reload_restores_state() {
        let mut pack = memory_pack(3);
        add_bytes(&mut pack, "a", b"one");
        add_bytes(&mut pack, "b", b"two");
        add_bytes(&mut pack, "c", b"three");
        pack.remove("b").expect("remove");

        let mut pack = reload(pack);
        assert_eq!(pack.len(), 2);
        assert_eq!(pack.free_slots(), 1);
        assert_eq!(extract(&mut pack, "c"), b"three");

        let mut meta = pack.list_metadata();
        meta.sort_by_key(|m| m.slot);
        assert_eq!(meta[0].slot, 0);
        assert_eq!(meta[1].slot, 2);
        assert_eq!(meta[1].name, b"c");
    }

    #[test]
    fn test_load_rejects_duplicate_names() {
        let mut pack = memory_pack(2);
        add_bytes(&mut pack, "a", b"xyz");
        let mut bytes = pack.into_inner().into_inner();
        // Point slot 1 at the same entry as slot 0.
        bytes.copy_within(4..8, 8);

        let err = DatPack::load(Cursor::new(bytes), &PackConfig::default())
            .err()
            .expect("duplicate name");
        assert!(matches!(err, FtlDatError::CorruptIndex(_)));
    }

    #[test]
    fn test_load_rejects_slot_inside_table() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let err = DatPack::load(Cursor::new(bytes), &PackConfig::default())
            .err()
            .expect("slot inside table");
        assert!(matches!(err, FtlDatError::CorruptIndex(_)));
    }

    #[test]
    fn test_load_rejects_dangling_slot() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&500u32.to_le_bytes());

        assert!(DatPack::load(Cursor::new(bytes), &PackConfig::default()).is_err());
    }

    #[test]
    fn test_list_and_sizes() {
        let mut pack = memory_pack(2);
        add_bytes(&mut pack, "a", b"xyz");
        add_bytes(&mut pack, "b", b"hi");

        let mut names: Vec<&[u8]> = pack.list().collect();
        names.sort_unstable();
        assert_eq!(names, vec![b"a".as_slice(), b"b".as_slice()]);

        let mut sizes: Vec<(&[u8], u32)> = pack.list_sizes().collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![(b"a".as_slice(), 3), (b"b".as_slice(), 2)]);
    }
}
