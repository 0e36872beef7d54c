//! Storage engine for FTL `.dat` game-asset archives.
//!
//! A `.dat` file is a single container holding many named blobs. It starts
//! with a fixed-capacity slot table and is followed by the entries in
//! arbitrary physical order:
//!
//! ```text
//! [index_size: u32]
//! [slot_0: u32] [slot_1: u32] ... [slot_{index_size-1}: u32]   0 = free
//! entry := [size: u32] [name_len: u32] [name] [payload; size bytes]
//! ```
//!
//! All integers are little-endian. A slot holds the absolute offset of its
//! entry header. New entries are always appended at end-of-file; removal
//! only clears the slot, and [`DatPack::repack`] reclaims the slack.
//!
//! # Components
//!
//! - [`entry`]: entry header codec
//! - [`copy`]: bounded chunk copier shared by streaming and relocation
//! - [`index`]: the on-disk slot table and its free-slot pool
//! - [`pack`]: the container engine, slot growth and repacking
//! - [`folder`]: a plain-directory mirror of the same key space
//!
//! # Example
//!
//! ```rust,no_run
//! use ftldat::DatPack;
//! use std::io::Cursor;
//!
//! # fn example() -> ftldat::Result<()> {
//! let mut pack = DatPack::create("data.dat", 16)?;
//! pack.add(b"img/ship.png", &mut Cursor::new(b"png bytes"), 9)?;
//!
//! let mut out = Vec::new();
//! pack.extract_to(b"img/ship.png", &mut out)?;
//! assert_eq!(out, b"png bytes");
//!
//! let stats = pack.repack()?;
//! println!("{} -> {} bytes", stats.old_size, stats.new_size);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Storage backing abstraction
pub mod backing;

// Configuration
pub mod config;

// Chunked byte copying
pub mod copy;

// Entry header codec
pub mod entry;

// Error types
pub mod error;

// Filesystem mirror
pub mod folder;

// Content hashing for display
pub mod hash;

// Slot table
pub mod index;

// Container engine
pub mod pack;

// Path and size helpers
pub mod path;

// Common pack contract
pub mod store;

pub use backing::Backing;
pub use config::PackConfig;
pub use entry::{EntryHeader, EntryMeta};
pub use error::{FtlDatError, Result};
pub use folder::FolderPack;
pub use hash::HashWriter;
pub use index::SlotIndex;
pub use pack::{DatPack, EntryInfo, RepackStats};
pub use path::human_size;
pub use store::PackStore;

/// Version information for the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Slot capacity used when creating a container without an explicit size.
pub const DEFAULT_INDEX_SIZE: u32 = 2048;

/// Default chunk size for streaming copies (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
