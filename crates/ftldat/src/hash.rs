//! MD5 digests of streamed entry content

use md5::{Digest, Md5};
use std::io::{self, Write};

/// Write sink that hashes everything written to it.
///
/// Lets any `extract_to` target an MD5 digest without buffering the
/// payload.
#[derive(Default)]
pub struct HashWriter {
    hasher: Md5,
}

impl HashWriter {
    /// Create an empty hasher
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish and return the digest as lowercase hex
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
