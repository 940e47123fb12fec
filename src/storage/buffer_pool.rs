//! # LRU Buffer Pool
//!
//! This module implements the block cache that mediates every byte of I/O
//! between the logical memory pool and its backing file.
//!
//! ## Design Overview
//!
//! The pool manages up to `N` fixed-size buffers, each mirroring one
//! `block_size`-aligned block of the backing file, kept in
//! most-recently-used-first order:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┐
//! │ block 3  │ block 0  │ block 7  │ block 1  │
//! │  (MRU)   │          │          │  (LRU)   │
//! └──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! Every read or write resolves its target block per byte
//! (`block = offset / block_size`) and *touches* that block's buffer:
//!
//! - **Hit**: the buffer moves to the front of the list.
//! - **Miss, pool not full**: the block is read from disk into a fresh
//!   buffer inserted at the front.
//! - **Miss, pool full**: the tail buffer is evicted (written back first
//!   when dirty) and its byte allocation is reused for the incoming block.
//!
//! Reads past the current end of file zero-fill the remainder of the block;
//! the file grows lazily when dirty blocks beyond its end are written back.
//!
//! ## Counters
//!
//! Four monotonically increasing counters (cache hits, cache misses, disk
//! reads, disk writes) are exposed read-only. Hits and misses count
//! per-byte touches; disk counters count whole-block transfers.
//!
//! ## Failure
//!
//! I/O errors surface as fatal to the calling operation; the pool makes no
//! recovery attempt.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};

/// One cached block: its number, bytes, and dirty flag.
#[derive(Debug)]
struct Buffer {
    number: u64,
    bytes: Box<[u8]>,
    dirty: bool,
}

/// Buffer-pool performance counters. All values are monotonically
/// increasing over the life of the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

/// LRU cache of file blocks. See the module docs for the replacement
/// policy.
#[derive(Debug)]
pub struct BufferPool {
    file: File,
    /// Resident buffers in MRU-first order.
    buffers: Vec<Buffer>,
    capacity: usize,
    block_size: usize,
    stats: CacheStats,
}

impl BufferPool {
    /// Opens (creating if absent) the backing file at `path` with space for
    /// `capacity` buffers of `block_size` bytes each.
    pub fn open(path: &Path, capacity: usize, block_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open backing file {:?}", path))?;
        Self::new(file, capacity, block_size)
    }

    pub fn new(file: File, capacity: usize, block_size: usize) -> Result<Self> {
        ensure!(capacity >= 1, "buffer pool needs at least one buffer");
        ensure!(block_size >= 1, "block size must be at least one byte");
        Ok(Self {
            file,
            buffers: Vec::with_capacity(capacity),
            capacity,
            block_size,
            stats: CacheStats::default(),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Resident block numbers in MRU-first order.
    pub fn block_ids(&self) -> Vec<u64> {
        self.buffers.iter().map(|b| b.number).collect()
    }

    /// Reads `len` bytes starting at file offset `offset`, touching every
    /// block the range covers.
    pub fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        for i in 0..len as u64 {
            let pos = offset + i;
            let block = pos / self.block_size as u64;
            self.touch(block)?;
            out.push(self.buffers[0].bytes[(pos % self.block_size as u64) as usize]);
        }
        Ok(out)
    }

    /// Overwrites `bytes.len()` bytes starting at file offset `offset`,
    /// marking every touched buffer dirty.
    pub fn write(&mut self, bytes: &[u8], offset: u64) -> Result<()> {
        for (i, &b) in bytes.iter().enumerate() {
            let pos = offset + i as u64;
            let block = pos / self.block_size as u64;
            self.touch(block)?;
            self.buffers[0].bytes[(pos % self.block_size as u64) as usize] = b;
            self.buffers[0].dirty = true;
        }
        Ok(())
    }

    /// Writes every dirty buffer back to its block's file offset and clears
    /// the dirty flags.
    pub fn flush(&mut self) -> Result<()> {
        for i in 0..self.buffers.len() {
            if self.buffers[i].dirty {
                let off = self.buffers[i].number * self.block_size as u64;
                self.file
                    .seek(SeekFrom::Start(off))
                    .wrap_err("failed to seek for buffer write-back")?;
                self.file
                    .write_all(&self.buffers[i].bytes)
                    .wrap_err("failed to write buffer back to disk")?;
                self.stats.disk_writes += 1;
                self.buffers[i].dirty = false;
            }
        }
        Ok(())
    }

    /// Flushes all dirty buffers, syncs, and releases the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.file
            .sync_all()
            .wrap_err("failed to sync backing file on close")?;
        Ok(())
    }

    /// Ensures `block` is resident at the front of the list.
    fn touch(&mut self, block: u64) -> Result<()> {
        if let Some(i) = self.buffers.iter().position(|b| b.number == block) {
            self.buffers[..=i].rotate_right(1);
            self.stats.cache_hits += 1;
            return Ok(());
        }
        self.admit(block)
    }

    /// Brings a non-resident block in at the front, evicting the tail
    /// buffer when the pool is full.
    fn admit(&mut self, block: u64) -> Result<()> {
        let buffer = if self.buffers.len() == self.capacity {
            let mut victim = self.buffers.pop().expect("capacity is at least one");
            if victim.dirty {
                let off = victim.number * self.block_size as u64;
                self.file
                    .seek(SeekFrom::Start(off))
                    .wrap_err("failed to seek for eviction write-back")?;
                self.file
                    .write_all(&victim.bytes)
                    .wrap_err("failed to write evicted buffer to disk")?;
                self.stats.disk_writes += 1;
            }
            // Reuse the victim's allocation for the incoming block.
            self.read_block(block, &mut victim.bytes)?;
            victim.number = block;
            victim.dirty = false;
            victim
        } else {
            let mut bytes = vec![0u8; self.block_size].into_boxed_slice();
            self.read_block(block, &mut bytes)?;
            Buffer {
                number: block,
                bytes,
                dirty: false,
            }
        };
        self.buffers.insert(0, buffer);
        self.stats.cache_misses += 1;
        Ok(())
    }

    /// Reads one block from disk into `buf`, zero-filling past end of file.
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(block * self.block_size as u64))
            .wrap_err("failed to seek for block read")?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .file
                .read(&mut buf[filled..])
                .wrap_err("failed to read block from disk")?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf[filled..].fill(0);
        self.stats.disk_reads += 1;
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Best-effort write-back so dirty data is not silently lost on
        // non-close exit paths. Errors here have no caller to report to.
        let _ = self.flush();
    }
}
