//! # Storage Module
//!
//! This module provides the storage layer of the engine: a logical,
//! byte-addressable memory pool persisted in a single backing file, with an
//! LRU buffer cache mediating all block I/O and a free-block allocator
//! managing the pool's space.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │        MemManager (allocator)             │
//! │   insert / get / remove, pool growth,     │
//! │   boot record for clean close / reopen    │
//! ├─────────────────────┬─────────────────────┤
//! │  FreeList           │  MemoryPool         │
//! │  circular first-fit │  length-prefixed    │
//! │  extents, coalesce  │  records            │
//! ├─────────────────────┴─────────────────────┤
//! │        BufferPool (LRU block cache)       │
//! ├───────────────────────────────────────────┤
//! │          Backing file (the pool,          │
//! │            byte-for-byte)                 │
//! └───────────────────────────────────────────┘
//! ```
//!
//! Every stored datum, trie node images and encoded sequence payloads
//! alike, is a *record*: a big-endian 16-bit length prefix followed by its
//! payload,
//! addressed by a [`Handle`] (its byte offset in the pool). The allocator
//! is the only component that mutates the pool or the free list; the cache
//! is the only component that touches the file.
//!
//! ## Thread Safety
//!
//! The engine is strictly single-threaded; none of these types use or need
//! synchronization.

mod buffer_pool;
mod freelist;
mod manager;
mod pool;

pub use buffer_pool::{BufferPool, CacheStats};
pub use freelist::{Extent, FreeList};
pub use manager::{BootState, Handle, MemManager, STORE_MAGIC, STORE_VERSION};
pub use pool::{MemoryPool, RECORD_PREFIX};
