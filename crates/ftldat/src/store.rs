//! Common contract for anything that stores named blobs.
//!
//! [`DatPack`] and [`FolderPack`](crate::FolderPack) both implement
//! [`PackStore`], so front ends can list, hash and move entries without
//! caring which side is the archive.

use crate::backing::Backing;
use crate::hash::HashWriter;
use crate::pack::DatPack;
use crate::Result;
use std::io::{Read, Write};

/// Named blob storage.
pub trait PackStore {
    /// Names of all entries
    fn list(&self) -> Result<Vec<Vec<u8>>>;

    /// Names and sizes of all entries
    fn list_sizes(&self) -> Result<Vec<(Vec<u8>, u64)>>;

    /// Store exactly `size` bytes from `source` under `name`
    fn add<R: Read + ?Sized>(&mut self, name: &[u8], source: &mut R, size: u64) -> Result<()>;

    /// Stream the content of `name` into `sink`
    fn extract_to<W: Write + ?Sized>(&mut self, name: &[u8], sink: &mut W) -> Result<()>;

    /// Delete `name`
    fn remove(&mut self, name: &[u8]) -> Result<()>;

    /// Whether `name` exists
    fn contains(&self, name: &[u8]) -> bool;

    /// MD5 of every entry as `(name, hex digest)`, sorted by name.
    fn hashes(&mut self) -> Result<Vec<(Vec<u8>, String)>> {
        let mut names = self.list()?;
        names.sort_unstable();

        let mut hashes = Vec::with_capacity(names.len());
        for name in names {
            let mut hw = HashWriter::new();
            self.extract_to(&name, &mut hw)?;
            hashes.push((name, hw.finish()));
        }
        Ok(hashes)
    }

    /// Sum of all entry sizes
    fn total_size(&self) -> Result<u64> {
        Ok(self.list_sizes()?.iter().map(|(_, size)| size).sum())
    }
}

impl<S: Backing> PackStore for DatPack<S> {
    fn list(&self) -> Result<Vec<Vec<u8>>> {
        Ok(DatPack::list(self).map(<[u8]>::to_vec).collect())
    }

    fn list_sizes(&self) -> Result<Vec<(Vec<u8>, u64)>> {
        Ok(DatPack::list_sizes(self)
            .map(|(name, size)| (name.to_vec(), u64::from(size)))
            .collect())
    }

    fn add<R: Read + ?Sized>(&mut self, name: &[u8], source: &mut R, size: u64) -> Result<()> {
        DatPack::add(self, name, source, size)
    }

    fn extract_to<W: Write + ?Sized>(&mut self, name: &[u8], sink: &mut W) -> Result<()> {
        DatPack::extract_to(self, name, sink)
    }

    fn remove(&mut self, name: &[u8]) -> Result<()> {
        DatPack::remove(self, name)
    }

    fn contains(&self, name: &[u8]) -> bool {
        DatPack::contains(self, name)
    }
}
