//! # Logical Memory Pool
//!
//! The pool presents a byte-addressable array of logical size `S` whose
//! contents live in the backing file, with every access tunneled through
//! the [`BufferPool`]. It understands exactly one convention: a stored
//! record is a big-endian 16-bit length prefix followed by that many
//! payload bytes. What the bytes mean, and which addresses hold live
//! records, are its callers' concerns.
//!
//! Removal deliberately zeroes only the length prefix; the payload bytes
//! remain in the file until some later allocation overwrites them.

use eyre::{ensure, Result};

use super::buffer_pool::{BufferPool, CacheStats};

/// Byte length of the record length prefix.
pub const RECORD_PREFIX: u32 = 2;

#[derive(Debug)]
pub struct MemoryPool {
    cache: BufferPool,
    size: u32,
}

impl MemoryPool {
    pub fn new(cache: BufferPool, size: u32) -> Self {
        Self { cache, size }
    }

    /// Current logical pool size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Extends the logical pool. The backing file grows lazily as blocks in
    /// the new region are written back; old and new pool share every byte
    /// offset, so no copy is needed.
    pub fn grow(&mut self, new_size: u32) -> Result<()> {
        ensure!(
            new_size >= self.size,
            "pool cannot shrink ({} -> {})",
            self.size,
            new_size
        );
        self.size = new_size;
        Ok(())
    }

    /// Writes a length-prefixed record at `addr`.
    pub fn write_record(&mut self, addr: u32, payload: &[u8]) -> Result<()> {
        ensure!(
            payload.len() <= u16::MAX as usize,
            "record payload of {} bytes exceeds the 16-bit length prefix",
            payload.len()
        );
        self.check_span(addr, RECORD_PREFIX as u64 + payload.len() as u64)?;
        let len = (payload.len() as u16).to_be_bytes();
        self.cache.write(&len, addr as u64)?;
        self.cache.write(payload, addr as u64 + RECORD_PREFIX as u64)?;
        Ok(())
    }

    /// Reads the record at `addr`. An erased record (zeroed prefix) yields
    /// an empty payload.
    pub fn read_record(&mut self, addr: u32) -> Result<Vec<u8>> {
        let len = self.record_len(addr)?;
        self.check_span(addr, RECORD_PREFIX as u64 + len as u64)?;
        self.cache
            .read(addr as u64 + RECORD_PREFIX as u64, len as usize)
    }

    /// Reads the length prefix at `addr` without touching the payload.
    pub fn record_len(&mut self, addr: u32) -> Result<u16> {
        self.check_span(addr, RECORD_PREFIX as u64)?;
        let bytes = self.cache.read(addr as u64, RECORD_PREFIX as usize)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Erases the record at `addr` by zeroing its length prefix, returning
    /// the payload length that was stored there. Payload bytes are left
    /// intact.
    pub fn erase_length(&mut self, addr: u32) -> Result<u16> {
        let len = self.record_len(addr)?;
        self.cache.write(&[0, 0], addr as u64)?;
        Ok(len)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    pub fn close(self) -> Result<()> {
        self.cache.close()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resident buffer-pool block numbers, MRU first.
    pub fn block_ids(&self) -> Vec<u64> {
        self.cache.block_ids()
    }

    fn check_span(&self, addr: u32, len: u64) -> Result<()> {
        ensure!(
            addr as u64 + len <= self.size as u64,
            "access of {} bytes at address {} exceeds pool size {}",
            len,
            addr,
            self.size
        );
        Ok(())
    }
}
