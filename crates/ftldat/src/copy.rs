//! Bounded chunk copying.
//!
//! Every bulk byte movement in the engine goes through [`ChunkCopier`]:
//! streaming a caller's source into the container, streaming a payload out
//! to a sink, and relocating entries inside the container during growth and
//! repack. The buffer is allocated once and reused for every chunk.

use crate::{DEFAULT_CHUNK_SIZE, FtlDatError, Result};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

/// Reusable fixed-size copy buffer.
pub struct ChunkCopier {
    /// I/O buffer, one chunk long.
    buffer: Vec<u8>,
}

impl Default for ChunkCopier {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkCopier {
    /// Create a copier with a `chunk_size` byte buffer (at least 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: vec![0u8; chunk_size.max(1)],
        }
    }

    /// Get the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.buffer.len()
    }

    /// Copy exactly `len` bytes from `source` to `sink`.
    ///
    /// Fails with [`FtlDatError::ShortRead`] if `source` signals end of data
    /// first. Chunks copied before that point have already reached `sink`.
    pub fn copy_exact<R, W>(&mut self, source: &mut R, sink: &mut W, len: u64) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut remaining = len;
        while remaining > 0 {
            let want = self.chunk_len(remaining);
            let got = match source.read(&mut self.buffer[..want]) {
                Ok(0) => {
                    return Err(FtlDatError::ShortRead {
                        expected: len,
                        actual: len - remaining,
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            sink.write_all(&self.buffer[..got])?;
            remaining -= got as u64;
        }
        Ok(())
    }

    /// Move `len` bytes inside one stream from `src` to `dst`.
    ///
    /// Chunks are copied in increasing offset order, so the move is valid
    /// when `dst <= src` or when the ranges are disjoint. A destination
    /// that starts inside the source range would overwrite bytes before
    /// they are read and is refused with [`FtlDatError::RelocationOverlap`].
    pub fn copy_within<S>(&mut self, stream: &mut S, src: u64, dst: u64, len: u64) -> Result<()>
    where
        S: Read + Write + Seek + ?Sized,
    {
        if src == dst || len == 0 {
            return Ok(());
        }
        if dst > src && dst < src + len {
            return Err(FtlDatError::RelocationOverlap { src, dst, len });
        }

        let mut remaining = len;
        let mut src_pos = src;
        let mut dst_pos = dst;

        while remaining > 0 {
            let chunk = self.chunk_len(remaining);
            let buf = &mut self.buffer[..chunk];

            stream.seek(SeekFrom::Start(src_pos))?;
            stream.read_exact(buf)?;
            stream.seek(SeekFrom::Start(dst_pos))?;
            stream.write_all(buf)?;

            remaining -= chunk as u64;
            src_pos += chunk as u64;
            dst_pos += chunk as u64;
        }

        Ok(())
    }

    fn chunk_len(&self, remaining: u64) -> usize {
        usize::try_from(remaining).map_or(self.buffer.len(), |r| r.min(self.buffer.len()))
    }
}
