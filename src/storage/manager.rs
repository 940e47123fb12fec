//! # Memory Manager
//!
//! The manager binds the [`MemoryPool`] and the [`FreeList`] into the
//! engine's allocator. Every byte stored by the trie (node images and
//! sequence payloads alike) passes through `insert`/`get`/`remove` here
//! and is addressed by a [`Handle`], a 32-bit byte offset into the pool
//! pointing at a length-prefixed record.
//!
//! ## Growth
//!
//! When no free extent can satisfy a request, the pool grows by a fixed
//! increment: the logical size is raised and the new tail region is
//! released to the free list, where it coalesces with any trailing free
//! extent. The request then retries. Each step strictly increases
//! capacity, so termination is guaranteed; growth stops only at the
//! configured ceiling (by default the 32-bit handle space), which is the
//! only way an allocation can fail.
//!
//! ## Boot Record
//!
//! The backing file's layout is the pool byte-for-byte, so the state the
//! engine needs to find its data again after a clean close lives *inside*
//! the pool as ordinary records:
//!
//! ```text
//! Offset  Size  Description
//! 0       2     Record length prefix (always BOOT_PAYLOAD bytes)
//! 2       4     Magic: "DNAP"
//! 6       2     Format version
//! 8       4     Trie root handle
//! 12      4     Flyweight handle
//! 16      4     Stored sequence count
//! 20      4     Current pool size
//! 24      4     Free-list state record handle (u32::MAX when absent)
//! ```
//!
//! The boot record is the first allocation on a fresh pool and therefore
//! always sits at address 0. On clean close the free list (extent table
//! plus cursor) is serialized into a state record sized for the
//! post-allocation extent count, and the boot record is rewritten in place
//! to point at it. Reopening restores the extent table and then frees the
//! state record through the normal allocator path, which coalesces the
//! free list back to exactly its logical pre-close shape. A store that was
//! never closed cleanly has no state record and is refused (crash
//! recovery is out of scope).

use std::path::Path;

use eyre::{ensure, eyre, Result};
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::config::StoreConfig;

use super::buffer_pool::{BufferPool, CacheStats};
use super::freelist::{Extent, FreeList};
use super::pool::{MemoryPool, RECORD_PREFIX};

/// Magic bytes identifying a dnadb pool file ("DNAP").
pub const STORE_MAGIC: u32 = 0x444E_4150;

/// On-disk format version.
pub const STORE_VERSION: u16 = 1;

/// Sentinel for "no state record" in the boot image.
const NO_STATE: u32 = u32::MAX;

/// A stable reference to a length-prefixed record in the pool: its byte
/// offset. Handles remain valid until the record they address is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub fn addr(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-size boot image persisted at pool address 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct BootImage {
    magic: U32<BigEndian>,
    version: U16<BigEndian>,
    root: U32<BigEndian>,
    flyweight: U32<BigEndian>,
    sequence_count: U32<BigEndian>,
    pool_size: U32<BigEndian>,
    state: U32<BigEndian>,
}

const BOOT_PAYLOAD: usize = std::mem::size_of::<BootImage>();

/// Trie state carried across a clean close/reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootState {
    pub root: Handle,
    pub flyweight: Handle,
    pub sequence_count: u32,
}

/// The engine's allocator. See the module docs.
#[derive(Debug)]
pub struct MemManager {
    pool: MemoryPool,
    free: FreeList,
    growth_increment: u32,
    max_pool_size: u32,
}

impl MemManager {
    /// Opens the store at `path`. A fresh (empty) file is initialized with
    /// a boot record and yields no [`BootState`]; a nonempty file must
    /// carry a valid boot record from a clean close, whose trie state is
    /// returned for the caller to resume from.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<(Self, Option<BootState>)> {
        ensure!(
            config.pool_size as usize >= RECORD_PREFIX as usize + BOOT_PAYLOAD,
            "initial pool size {} cannot hold the boot record",
            config.pool_size
        );
        ensure!(
            config.growth_increment > 0,
            "growth increment must be positive"
        );
        let mut cache = BufferPool::open(path, config.buffers, config.block_size)?;
        let file_len = std::fs::metadata(path)
            .map(|m| m.len())
            .unwrap_or_default();

        if file_len == 0 {
            let pool = MemoryPool::new(cache, config.pool_size);
            let mut manager = Self {
                pool,
                free: FreeList::new(config.pool_size),
                growth_increment: config.growth_increment,
                max_pool_size: config.max_pool_size,
            };
            let boot = BootImage {
                magic: U32::new(STORE_MAGIC),
                version: U16::new(STORE_VERSION),
                root: U32::new(0),
                flyweight: U32::new(0),
                sequence_count: U32::new(0),
                pool_size: U32::new(config.pool_size),
                state: U32::new(NO_STATE),
            };
            let handle = manager
                .insert(boot.as_bytes())?
                .ok_or_else(|| eyre!("initial pool too small for the boot record"))?;
            ensure!(
                handle.addr() == 0,
                "boot record landed at address {} instead of 0",
                handle.addr()
            );
            return Ok((manager, None));
        }

        // Existing store: the boot record's length prefix and image sit at
        // the very start of the pool.
        let prefix = cache.read(0, RECORD_PREFIX as usize)?;
        let stored_len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
        ensure!(
            stored_len == BOOT_PAYLOAD,
            "boot record length {} does not match expected {} (corrupt store?)",
            stored_len,
            BOOT_PAYLOAD
        );
        let payload = cache.read(RECORD_PREFIX as u64, BOOT_PAYLOAD)?;
        let boot = BootImage::ref_from_bytes(&payload[..])
            .map_err(|e| eyre!("failed to parse boot record: {:?}", e))?;
        ensure!(
            boot.magic.get() == STORE_MAGIC,
            "bad magic {:#010x} in pool file (corrupt store?)",
            boot.magic.get()
        );
        ensure!(
            boot.version.get() == STORE_VERSION,
            "unsupported store version {}",
            boot.version.get()
        );
        ensure!(
            boot.state.get() != NO_STATE,
            "store was not closed cleanly; free-list state is unrecoverable"
        );

        let pool_size = boot.pool_size.get();
        let state = Handle::new(boot.state.get());
        let resume = BootState {
            root: Handle::new(boot.root.get()),
            flyweight: Handle::new(boot.flyweight.get()),
            sequence_count: boot.sequence_count.get(),
        };

        let mut manager = Self {
            pool: MemoryPool::new(cache, pool_size),
            free: FreeList::new(0),
            growth_increment: config.growth_increment,
            max_pool_size: config.max_pool_size,
        };
        manager.free = manager.load_state(state)?;
        // Freeing the state record coalesces the restored list back to its
        // logical pre-close shape.
        manager.remove(state)?;
        // Until the next clean close this store counts as not-cleanly-closed.
        manager.set_boot_state_handle(NO_STATE)?;
        Ok((manager, Some(resume)))
    }

    /// Stores `bytes` as a new record, growing the pool as needed. Returns
    /// `None` only when growth has hit the configured ceiling.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<Option<Handle>> {
        ensure!(
            bytes.len() <= u16::MAX as usize,
            "record of {} bytes exceeds the maximum payload",
            bytes.len()
        );
        let need = bytes.len() as u32 + RECORD_PREFIX;
        loop {
            if let Some(addr) = self.free.acquire(need) {
                self.pool.write_record(addr, bytes)?;
                return Ok(Some(Handle::new(addr)));
            }
            if !self.grow()? {
                return Ok(None);
            }
        }
    }

    /// Retrieves the payload of the record at `handle`. An erased record
    /// yields an empty payload.
    pub fn get(&mut self, handle: Handle) -> Result<Vec<u8>> {
        self.pool.read_record(handle.addr())
    }

    /// Frees the record at `handle`, returning its payload length. The
    /// length prefix is zeroed and the full record span goes back to the
    /// free list; payload bytes stay in the file until overwritten.
    pub fn remove(&mut self, handle: Handle) -> Result<u16> {
        let len = self.pool.erase_length(handle.addr())?;
        self.free.release(handle.addr(), len as u32 + RECORD_PREFIX);
        Ok(len)
    }

    /// Rewrites a record in place. Only valid when the payload length is
    /// unchanged; used for the boot record.
    fn rewrite(&mut self, handle: Handle, bytes: &[u8]) -> Result<()> {
        let current = self.pool.record_len(handle.addr())?;
        ensure!(
            current as usize == bytes.len(),
            "in-place rewrite changed record length ({} -> {})",
            current,
            bytes.len()
        );
        self.pool.write_record(handle.addr(), bytes)
    }

    /// Adds one growth increment to the pool and releases it to the free
    /// list. Returns `false` when the ceiling has been reached.
    fn grow(&mut self) -> Result<bool> {
        let old = self.pool.size();
        let headroom = self.max_pool_size.saturating_sub(old);
        let step = self.growth_increment.min(headroom);
        if step == 0 {
            return Ok(false);
        }
        self.pool.grow(old + step)?;
        self.free.release(old, step);
        Ok(true)
    }

    /// Current logical pool size in bytes.
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    /// Free-list view for diagnostics and invariant checks.
    pub fn free_extents(&self) -> &[Extent] {
        self.free.extents()
    }

    pub fn free_total(&self) -> u64 {
        self.free.total_free()
    }

    /// Free-block list textual form (`addr:size` extents, `*` on the
    /// cursor extent).
    pub fn free_blocks_render(&self) -> String {
        self.free.render()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.pool.cache_stats()
    }

    /// Buffer-pool block numbers, MRU first.
    pub fn block_ids(&self) -> Vec<u64> {
        self.pool.block_ids()
    }

    /// Forces all dirty buffers to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.pool.flush()
    }

    /// Cleanly closes the store: persists the free list as a state record,
    /// rewrites the boot record with `state`, flushes, and releases the
    /// file.
    pub fn close(mut self, state: BootState) -> Result<()> {
        let state_handle = self.save_state()?;
        let boot = BootImage {
            magic: U32::new(STORE_MAGIC),
            version: U16::new(STORE_VERSION),
            root: U32::new(state.root.addr()),
            flyweight: U32::new(state.flyweight.addr()),
            sequence_count: U32::new(state.sequence_count),
            pool_size: U32::new(self.pool.size()),
            state: U32::new(state_handle.addr()),
        };
        self.rewrite(Handle::new(0), boot.as_bytes())?;
        self.pool.close()
    }

    /// Serializes the free list into a state record. The record is sized
    /// for one extent more than currently exist, because allocating it can
    /// itself split an extent or trigger growth; the actual count is
    /// stored in the payload and the spare slot stays zeroed.
    fn save_state(&mut self) -> Result<Handle> {
        let capacity = self.free.extents().len() + 1;
        let payload_len = 8 + capacity * 8;
        ensure!(
            payload_len <= u16::MAX as usize,
            "free list too fragmented to persist ({} extents)",
            capacity - 1
        );
        let handle = self
            .insert(&vec![0u8; payload_len])?
            .ok_or_else(|| eyre!("out of space while persisting the free list"))?;

        let extents = self.free.extents();
        ensure!(
            extents.len() <= capacity,
            "free list grew past its snapshot capacity"
        );
        let mut payload = Vec::with_capacity(payload_len);
        payload.extend_from_slice(&(extents.len() as u32).to_be_bytes());
        payload.extend_from_slice(&(self.free.cursor() as u32).to_be_bytes());
        for e in extents {
            payload.extend_from_slice(&e.addr.to_be_bytes());
            payload.extend_from_slice(&e.size.to_be_bytes());
        }
        payload.resize(payload_len, 0);
        self.rewrite(handle, &payload)?;
        Ok(handle)
    }

    /// Decodes a state record back into a free list.
    fn load_state(&mut self, handle: Handle) -> Result<FreeList> {
        let payload = self.get(handle)?;
        ensure!(
            payload.len() >= 8,
            "free-list state record truncated ({} bytes)",
            payload.len()
        );
        let count = u32::from_be_bytes(payload[0..4].try_into().unwrap()) as usize;
        let cursor = u32::from_be_bytes(payload[4..8].try_into().unwrap()) as usize;
        ensure!(
            payload.len() >= 8 + count * 8,
            "free-list state record claims {} extents but holds {} bytes",
            count,
            payload.len()
        );
        let mut extents = Vec::with_capacity(count);
        for i in 0..count {
            let off = 8 + i * 8;
            extents.push(Extent {
                addr: u32::from_be_bytes(payload[off..off + 4].try_into().unwrap()),
                size: u32::from_be_bytes(payload[off + 4..off + 8].try_into().unwrap()),
            });
        }
        Ok(FreeList::from_parts(extents, cursor))
    }

    /// Overwrites only the state-handle field of the boot record.
    fn set_boot_state_handle(&mut self, value: u32) -> Result<()> {
        let payload = self.get(Handle::new(0))?;
        let mut boot = *BootImage::ref_from_bytes(&payload[..])
            .map_err(|e| eyre!("failed to parse boot record: {:?}", e))?;
        boot.state = U32::new(value);
        self.rewrite(Handle::new(0), boot.as_bytes())
    }
}
