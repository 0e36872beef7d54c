//! Error types for `.dat` container operations

use thiserror::Error;

/// Errors that can occur while reading or mutating a container.
#[derive(Debug, Error)]
pub enum FtlDatError {
    /// I/O error on the backing file or a caller stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary decode or encode failure.
    #[error("Invalid format: {0}")]
    Format(String),

    /// An entry with this name already exists. Nothing was written.
    #[error("Entry already exists: {}", String::from_utf8_lossy(.0))]
    DuplicateKey(Vec<u8>),

    /// No entry with this name exists. Nothing was written.
    #[error("Entry not found: {}", String::from_utf8_lossy(.0))]
    NotFound(Vec<u8>),

    /// The slot table is inconsistent with the entries it points to.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Two entries claim overlapping byte ranges.
    #[error(
        "Overlapping entries: [{first_start}, {first_end}) runs into entry at {second_start}"
    )]
    OverlappingEntries {
        /// Header offset of the lower entry
        first_start: u64,
        /// End offset (exclusive) of the lower entry
        first_end: u64,
        /// Header offset of the entry it runs into
        second_start: u64,
    },

    /// The source stream ended before the declared size was copied.
    ///
    /// Bytes already copied remain in the file as unreferenced slack.
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Declared size
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },

    /// The payload size does not fit the 32-bit size field.
    #[error("Entry too large: {0} bytes")]
    EntryTooLarge(u64),

    /// The container would grow past the 32-bit offset limit.
    #[error("Offset overflow: {0} exceeds the 32-bit address space")]
    OffsetOverflow(u64),

    /// The name cannot be mapped onto a filesystem path.
    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    /// A relocation would copy over bytes it has not read yet.
    #[error("Unsafe relocation of {len} bytes from {src} to {dst}")]
    RelocationOverlap {
        /// Source offset
        src: u64,
        /// Destination offset
        dst: u64,
        /// Number of bytes
        len: u64,
    },
}

impl From<binrw::Error> for FtlDatError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Self::Io(io),
            other => Self::Format(other.to_string()),
        }
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, FtlDatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FtlDatError::DuplicateKey(b"data/text.xml".to_vec());
        assert_eq!(err.to_string(), "Entry already exists: data/text.xml");

        let err = FtlDatError::NotFound(b"img/missing.png".to_vec());
        assert!(err.to_string().contains("img/missing.png"));

        let err = FtlDatError::ShortRead {
            expected: 10,
            actual: 4,
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('4'));

        let err = FtlDatError::OverlappingEntries {
            first_start: 100,
            first_end: 150,
            second_start: 120,
        };
        assert!(err.to_string().contains("[100, 150)"));
    }

    #[test]
    fn test_binrw_io_error_stays_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: FtlDatError = binrw::Error::Io(io).into();
        assert!(matches!(err, FtlDatError::Io(_)));
    }
}
