//! Byte storage a container can live in.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// Seekable, writable, truncatable storage owned by a [`DatPack`](crate::DatPack).
///
/// Implemented for [`File`] and for in-memory [`Cursor<Vec<u8>>`].
pub trait Backing: Read + Write + Seek {
    /// Shrink or extend the storage to exactly `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Backing for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Backing for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds usize"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_truncate() {
        let mut cursor = Cursor::new(vec![1u8; 10]);
        cursor.truncate(4).expect("truncate");
        assert_eq!(cursor.get_ref(), &[1, 1, 1, 1]);

        cursor.truncate(6).expect("extend");
        assert_eq!(cursor.get_ref(), &[1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_file_truncate() {
        let mut file = tempfile::tempfile().expect("tempfile");
        file.write_all(&[7u8; 32]).expect("write");
        Backing::truncate(&mut file, 8).expect("truncate");
        assert_eq!(file.metadata().expect("metadata").len(), 8);
    }
}
