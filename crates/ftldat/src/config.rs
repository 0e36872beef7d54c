//! Configuration for container creation and streaming I/O

use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_INDEX_SIZE, FtlDatError, Result};
use serde::{Deserialize, Serialize};

/// Tunables for a [`DatPack`](crate::DatPack)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Slot capacity written when creating a new container
    pub index_size: u32,

    /// Buffer size for streaming add/extract and entry relocation
    pub chunk_size: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            index_size: DEFAULT_INDEX_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PackConfig {
    /// Create a configuration with the given initial slot capacity
    pub fn new(index_size: u32) -> Self {
        Self {
            index_size,
            ..Default::default()
        }
    }

    /// Set the initial slot capacity
    #[must_use]
    pub const fn with_index_size(mut self, index_size: u32) -> Self {
        self.index_size = index_size;
        self
    }

    /// Set the streaming chunk size
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FtlDatError::Format(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}
