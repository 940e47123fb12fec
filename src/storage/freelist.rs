//! # Free-Block List
//!
//! This module tracks the unallocated regions of the memory pool as an
//! address-ordered list of extents and serves allocation requests with a
//! **circular first-fit** policy.
//!
//! ## Circular First Fit
//!
//! A cursor into the extent list persists across calls. Each request scans
//! at most one full lap starting at the cursor and takes the first extent
//! large enough; a strictly larger extent leaves its remainder in place
//! with the cursor parked on it. Preserving the cursor spreads allocations
//! across the arena instead of clustering fragmentation at low addresses,
//! at the cost of not being best-fit.
//!
//! ## Coalescing
//!
//! Releasing a region merges it with any extent it touches on either side,
//! so the list never contains two adjacent extents:
//!
//! | Left adjacent | Right adjacent | Result                                   |
//! |---------------|----------------|------------------------------------------|
//! | no            | no             | new extent inserted                      |
//! | yes           | no             | left extent extended                     |
//! | no            | yes            | right extent pulled back and extended    |
//! | yes           | yes            | both merged into one                     |
//!
//! After any mutation the list still satisfies: extents disjoint,
//! non-touching, strictly ordered by address, and the cursor indexes a
//! valid extent whenever the list is non-empty. A debug-mode verifier
//! asserts this.

use smallvec::SmallVec;

/// A contiguous unallocated region of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub addr: u32,
    pub size: u32,
}

impl Extent {
    fn end(&self) -> u32 {
        self.addr + self.size
    }
}

/// Address-ordered free-extent list with a circular allocation cursor.
#[derive(Debug, Clone)]
pub struct FreeList {
    extents: SmallVec<[Extent; 8]>,
    cursor: usize,
}

impl FreeList {
    /// A list covering the single extent `[0, size)`; empty when `size`
    /// is zero.
    pub fn new(size: u32) -> Self {
        let mut extents = SmallVec::new();
        if size > 0 {
            extents.push(Extent { addr: 0, size });
        }
        Self { extents, cursor: 0 }
    }

    /// Rebuilds a list from persisted parts.
    pub fn from_parts(extents: Vec<Extent>, cursor: usize) -> Self {
        let cursor = if extents.is_empty() {
            0
        } else {
            cursor.min(extents.len() - 1)
        };
        let list = Self {
            extents: SmallVec::from_vec(extents),
            cursor,
        };
        list.verify();
        list
    }

    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Total free bytes across all extents.
    pub fn total_free(&self) -> u64 {
        self.extents.iter().map(|e| e.size as u64).sum()
    }

    /// Claims `size` bytes via circular first fit. Returns the address of
    /// the claimed region, or `None` when no extent is large enough.
    pub fn acquire(&mut self, size: u32) -> Option<u32> {
        debug_assert!(size > 0);
        let n = self.extents.len();
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            if self.extents[idx].size >= size {
                let addr = self.extents[idx].addr;
                if self.extents[idx].size > size {
                    // Leave the remainder in place; the cursor parks on it.
                    self.extents[idx].addr += size;
                    self.extents[idx].size -= size;
                    self.cursor = idx;
                } else {
                    self.extents.remove(idx);
                    self.cursor = if self.extents.is_empty() {
                        0
                    } else {
                        idx % self.extents.len()
                    };
                }
                self.verify();
                return Some(addr);
            }
        }
        None
    }

    /// Returns the region `[addr, addr + size)` to the list, coalescing
    /// with immediate neighbors.
    pub fn release(&mut self, addr: u32, size: u32) {
        debug_assert!(size > 0);
        let pos = self.extents.partition_point(|e| e.addr < addr);
        let left = pos > 0 && self.extents[pos - 1].end() == addr;
        let right = pos < self.extents.len() && addr + size == self.extents[pos].addr;

        match (left, right) {
            (false, false) => {
                let was_empty = self.extents.is_empty();
                self.extents.insert(pos, Extent { addr, size });
                if !was_empty && pos <= self.cursor {
                    self.cursor += 1;
                }
            }
            (true, false) => {
                self.extents[pos - 1].size += size;
            }
            (false, true) => {
                self.extents[pos].addr = addr;
                self.extents[pos].size += size;
            }
            (true, true) => {
                self.extents[pos - 1].size += size + self.extents[pos].size;
                self.extents.remove(pos);
                if self.cursor >= pos {
                    // The right extent merged into its left neighbor; keep
                    // the cursor on the extent it was pointing at.
                    self.cursor -= 1;
                }
            }
        }
        if self.cursor >= self.extents.len() && !self.extents.is_empty() {
            self.cursor = 0;
        }
        self.verify();
    }

    /// Textual form: extents as `addr:size`, comma separated, the cursor
    /// extent marked with a leading `*`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, e) in self.extents.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if i == self.cursor {
                out.push('*');
            }
            out.push_str(&format!("{}:{}", e.addr, e.size));
        }
        out
    }

    /// Debug-mode structural verifier: strict address order, no adjacency,
    /// cursor validity.
    fn verify(&self) {
        if cfg!(debug_assertions) {
            for pair in self.extents.windows(2) {
                debug_assert!(
                    pair[0].end() < pair[1].addr,
                    "free extents out of order or touching: {:?} then {:?}",
                    pair[0],
                    pair[1]
                );
            }
            debug_assert!(
                self.extents.is_empty() || self.cursor < self.extents.len(),
                "cursor {} out of range for {} extents",
                self.cursor,
                self.extents.len()
            );
        }
    }
}
