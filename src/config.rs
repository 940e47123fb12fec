//! # Configuration Constants
//!
//! This module centralizes the engine's configuration constants, grouping
//! interdependent values together and documenting their relationships.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_POOL_SIZE (256 bytes)
//!       │
//!       └─> GROWTH_INCREMENT (100 bytes)
//!             Added to the pool each time an allocation cannot be satisfied.
//!             Deliberately modest so that growth exercises the free-list
//!             coalescer; the released tail extent merges with a trailing
//!             free extent whenever one exists.
//!
//! RECORD_MAX_PAYLOAD (65535 bytes)
//!       │
//!       └─> Derived from the 16-bit big-endian length prefix on every pool
//!           record. A DNA sequence of 65535 bases packs into 16384 payload
//!           bytes, so the longest accepted sequence fits with room to spare;
//!           the sequence-length cap itself comes from the 16-bit literal
//!           length stored in leaf nodes.
//!
//! DEFAULT_BUFFER_COUNT (4) and DEFAULT_BLOCK_SIZE (4096)
//!       │
//!       └─> Buffer-pool sizing used by the binary when the caller does not
//!           override them. Both are runtime parameters of the cache; block
//!           size 1 is pathological but supported.
//! ```
//!
//! Import constants from this module rather than defining them locally.

use std::path::PathBuf;

/// Initial size in bytes of the logical memory pool backing a fresh store.
pub const DEFAULT_POOL_SIZE: u32 = 256;

/// Bytes added to the pool each time an allocation request cannot be
/// satisfied from the free list.
pub const GROWTH_INCREMENT: u32 = 100;

/// Maximum payload bytes in a single pool record (16-bit length prefix).
pub const RECORD_MAX_PAYLOAD: usize = u16::MAX as usize;

/// Maximum base characters in a stored sequence (16-bit literal length).
pub const SEQUENCE_MAX_BASES: usize = u16::MAX as usize;

/// Default number of buffers managed by the buffer pool.
pub const DEFAULT_BUFFER_COUNT: usize = 4;

/// Default block size in bytes for buffer-pool I/O.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// File name of the backing pool file used by the `dnadb` binary.
pub const POOL_FILE_NAME: &str = "dnadb.pool";

/// Report lines crop sequences longer than this many characters.
pub const SEQUENCE_CROP_LENGTH: usize = 40;

/// Runtime configuration for opening a store.
///
/// The binary fills `buffers` and `block_size` from its command line and
/// leaves the rest at defaults; tests shrink `pool_size` or bound
/// `max_pool_size` to exercise growth and exhaustion paths.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Initial logical pool size in bytes for a fresh store.
    pub pool_size: u32,
    /// Bytes added per growth step when an allocation cannot be satisfied.
    pub growth_increment: u32,
    /// Hard ceiling on pool growth. Allocations that would push the pool
    /// past this bound fail instead of growing.
    pub max_pool_size: u32,
    /// Number of buffers in the buffer pool.
    pub buffers: usize,
    /// Block size in bytes for buffer-pool I/O.
    pub block_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            growth_increment: GROWTH_INCREMENT,
            max_pool_size: u32::MAX,
            buffers: DEFAULT_BUFFER_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl StoreConfig {
    /// Default configuration with the buffer-pool parameters supplied on the
    /// command line.
    pub fn with_cache(buffers: usize, block_size: usize) -> Self {
        Self {
            buffers,
            block_size,
            ..Self::default()
        }
    }
}

/// Path of the backing pool file for the binary, resolved in the current
/// working directory.
pub fn default_pool_path() -> PathBuf {
    PathBuf::from(POOL_FILE_NAME)
}
