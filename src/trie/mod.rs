//! # Persisted DNA Trie
//!
//! A 5-way radix trie keyed by the characters A, C, G, T and the synthetic
//! terminator `$`. Every node is a byte record in the memory pool, so the
//! tree on disk is connected purely by handles; descending into a child
//! means fetching and decoding its record, and rewriting a child means
//! inserting a new image and freeing the old one.
//!
//! ## Terminator
//!
//! Before insert, remove, or exact fetch, the sequence is logically
//! suffixed with `$`. A terminated sequence can no longer be a prefix of
//! another, which keeps the trie prefix-free and makes the exact-match
//! leaf unambiguous. The terminator is never encoded into payload bytes.
//!
//! ## Node rewrite protocol
//!
//! Mutations rebuild the spine above the touched leaf: when a child's
//! handle changes, the parent's image changes, so the parent is re-encoded
//! at a fresh handle and its previous image freed, cascading to the root.
//! Read-only descents (fetch, search, print, probes that find nothing)
//! perform no allocator traffic at all. The flyweight record is shared by
//! every empty slot and is never freed; vacating a child slot means
//! pointing it back at the flyweight.
//!
//! ## Collapse rule
//!
//! After a removal rewires a child, an internal node whose slots hold
//! exactly one leaf and four flyweights is replaced by that leaf. The
//! check is local; the effect propagates upward naturally as the recursion
//! unwinds, so a chain of singleton internals collapses in one pass.

mod node;
mod print;

pub use node::{TrieNode, CHILD_COUNT, TAG_EMPTY, TAG_INTERNAL, TAG_LEAF};
pub use print::PrintMode;

use eyre::{ensure, eyre, Result};

use crate::config::SEQUENCE_MAX_BASES;
use crate::sequence::{branch_index, DnaSequence};
use crate::storage::{BootState, Handle, MemManager};

/// Outcome of an insert attempt. Only `Inserted` changes engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted {
        /// Stored payload bytes including the 2-byte length prefix.
        stored_bytes: usize,
        /// Literal character count of the sequence.
        chars: usize,
        /// Pool address of the payload record.
        address: u32,
    },
    /// The sequence is already present.
    Duplicate,
    /// Empty sequence, or longer than the 16-bit literal length allows.
    InvalidSequence,
    /// The allocator hit its growth ceiling.
    OutOfSpace,
}

/// Outcome of a remove attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed {
        stored_bytes: usize,
        chars: usize,
        address: u32,
    },
    NotFound,
}

/// Result of a search: how many nodes were materialized, and every
/// matching sequence in DFS order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub nodes_visited: usize,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Removed {
    stored_bytes: usize,
    chars: usize,
    address: u32,
}

/// The persisted trie. Owns the allocator; all node and payload storage
/// flows through it.
#[derive(Debug)]
pub struct DnaTrie {
    manager: MemManager,
    root: Handle,
    flyweight: Handle,
    len: u32,
}

impl DnaTrie {
    /// Builds a trie over `manager`. A fresh store writes the single
    /// flyweight record and roots the tree there; a reopened store resumes
    /// from the persisted boot state.
    pub fn open(mut manager: MemManager, resume: Option<BootState>) -> Result<Self> {
        match resume {
            Some(state) => Ok(Self {
                manager,
                root: state.root,
                flyweight: state.flyweight,
                len: state.sequence_count,
            }),
            None => {
                let flyweight = manager
                    .insert(&TrieNode::Empty.encode())?
                    .ok_or_else(|| eyre!("no space for the flyweight record"))?;
                Ok(Self {
                    manager,
                    root: flyweight,
                    flyweight,
                    len: 0,
                })
            }
        }
    }

    /// Cleanly closes the trie and its store.
    pub fn close(self) -> Result<()> {
        let state = BootState {
            root: self.root,
            flyweight: self.flyweight,
            sequence_count: self.len,
        };
        self.manager.close(state)
    }

    /// Number of stored sequences.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn manager(&self) -> &MemManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut MemManager {
        &mut self.manager
    }

    /// Inserts `seq`, rejecting duplicates and unstorable sequences.
    pub fn insert(&mut self, seq: &DnaSequence) -> Result<InsertOutcome> {
        if seq.is_empty() || seq.len() > SEQUENCE_MAX_BASES {
            return Ok(InsertOutcome::InvalidSequence);
        }
        if self.fetch(seq)? {
            return Ok(InsertOutcome::Duplicate);
        }
        let encoded = match seq.encode() {
            Some(bytes) => bytes,
            None => return Ok(InsertOutcome::InvalidSequence),
        };
        let payload = match self.manager.insert(&encoded)? {
            Some(handle) => handle,
            None => return Ok(InsertOutcome::OutOfSpace),
        };

        let key = seq.terminated();
        let new_root = self.insert_at(self.root, payload, seq.len() as u16, &key, 0)?;
        self.replace_root(new_root);
        self.len += 1;
        Ok(InsertOutcome::Inserted {
            stored_bytes: encoded.len() + 2,
            chars: seq.len(),
            address: payload.addr(),
        })
    }

    /// Removes the exact sequence `seq` if present.
    pub fn remove(&mut self, seq: &DnaSequence) -> Result<RemoveOutcome> {
        if seq.is_empty() {
            return Ok(RemoveOutcome::NotFound);
        }
        let key = seq.terminated();
        let (new_root, removed) = self.remove_at(self.root, seq, &key, 0)?;
        self.replace_root(new_root);
        match removed {
            Some(info) => {
                self.len -= 1;
                Ok(RemoveOutcome::Removed {
                    stored_bytes: info.stored_bytes,
                    chars: info.chars,
                    address: info.address,
                })
            }
            None => Ok(RemoveOutcome::NotFound),
        }
    }

    /// Read-only exact-match probe for the `$`-terminated sequence.
    pub fn fetch(&mut self, seq: &DnaSequence) -> Result<bool> {
        if self.len == 0 {
            return Ok(false);
        }
        let key = seq.terminated();
        let mut handle = self.root;
        let mut depth = 0usize;
        loop {
            match self.load(handle)? {
                TrieNode::Empty => return Ok(false),
                TrieNode::Leaf {
                    payload,
                    literal_len,
                } => {
                    let resident = self.materialize(payload, literal_len)?;
                    return Ok(resident.as_str() == seq.as_str());
                }
                TrieNode::Internal { children } => {
                    if depth >= key.len() {
                        return Ok(false);
                    }
                    let idx = branch_index(key[depth])
                        .ok_or_else(|| eyre!("invalid character in trie key"))?;
                    handle = children[idx];
                    depth += 1;
                }
            }
        }
    }

    /// Searches for `query`. With `exact` set the query navigates with its
    /// terminator and a reached leaf must match the query's bases
    /// (terminators ignored on both sides); otherwise the query is a
    /// prefix: exhausting it inside the tree collects every sequence in
    /// the subtree, and a leaf reached early matches if the query is a
    /// prefix of its sequence.
    pub fn search(&mut self, query: &DnaSequence, exact: bool) -> Result<SearchOutcome> {
        let key = if exact {
            query.terminated()
        } else {
            query.as_str().as_bytes().to_vec()
        };
        let mut matches = Vec::new();
        let nodes_visited = self.search_at(self.root, query, exact, &key, 0, &mut matches)?;
        Ok(SearchOutcome {
            nodes_visited,
            matches,
        })
    }

    fn search_at(
        &mut self,
        handle: Handle,
        query: &DnaSequence,
        exact: bool,
        key: &[u8],
        depth: usize,
        matches: &mut Vec<String>,
    ) -> Result<usize> {
        match self.load(handle)? {
            TrieNode::Empty => Ok(1),
            TrieNode::Leaf {
                payload,
                literal_len,
            } => {
                let resident = self.materialize(payload, literal_len)?;
                let hit = if exact {
                    resident.as_str() == query.as_str()
                } else {
                    resident.as_str().starts_with(query.as_str())
                };
                if hit {
                    matches.push(resident.into_string());
                }
                Ok(1)
            }
            TrieNode::Internal { children } => {
                if depth < key.len() {
                    let idx = match branch_index(key[depth]) {
                        Some(idx) => idx,
                        None => return Ok(1),
                    };
                    Ok(1 + self.search_at(children[idx], query, exact, key, depth + 1, matches)?)
                } else {
                    // Query exhausted at a branch: everything below shares
                    // the prefix.
                    let mut visited = 1;
                    for child in children {
                        visited += self.collect_at(child, matches)?;
                    }
                    Ok(visited)
                }
            }
        }
    }

    /// DFS of a whole subtree, appending every leaf's sequence.
    fn collect_at(&mut self, handle: Handle, matches: &mut Vec<String>) -> Result<usize> {
        match self.load(handle)? {
            TrieNode::Empty => Ok(1),
            TrieNode::Leaf {
                payload,
                literal_len,
            } => {
                let resident = self.materialize(payload, literal_len)?;
                matches.push(resident.into_string());
                Ok(1)
            }
            TrieNode::Internal { children } => {
                let mut visited = 1;
                for child in children {
                    visited += self.collect_at(child, matches)?;
                }
                Ok(visited)
            }
        }
    }

    /// Recursive insert step. Returns the handle that should occupy this
    /// slot; when it differs from `slot`, the old image has already been
    /// freed (the flyweight excepted).
    fn insert_at(
        &mut self,
        slot: Handle,
        payload: Handle,
        literal_len: u16,
        key: &[u8],
        depth: usize,
    ) -> Result<Handle> {
        match self.load(slot)? {
            TrieNode::Empty => self.save(&TrieNode::Leaf {
                payload,
                literal_len,
            }),
            TrieNode::Leaf {
                payload: resident_payload,
                literal_len: resident_len,
            } => {
                // Collision: both sequences share the path to this depth.
                // Rebuild the slot as a branch, reinsert the resident
                // sequence, then the incoming one; shared prefixes split
                // recursively.
                let resident = self.materialize(resident_payload, resident_len)?;
                let resident_key = resident.terminated();
                ensure!(
                    resident_key.len() > depth,
                    "resident sequence shorter than its trie depth"
                );
                let mut branch = self.save(&TrieNode::vacant_internal(self.flyweight))?;
                branch = self.insert_at(branch, resident_payload, resident_len, &resident_key, depth)?;
                branch = self.insert_at(branch, payload, literal_len, key, depth)?;
                self.free_node(slot)?;
                Ok(branch)
            }
            TrieNode::Internal { mut children } => {
                ensure!(
                    depth < key.len(),
                    "trie descent ran past the key terminator"
                );
                let idx = branch_index(key[depth])
                    .ok_or_else(|| eyre!("invalid character in trie key"))?;
                children[idx] = self.insert_at(children[idx], payload, literal_len, key, depth + 1)?;
                let rewritten = self.save(&TrieNode::Internal { children })?;
                self.free_node(slot)?;
                Ok(rewritten)
            }
        }
    }

    /// Recursive remove step. Returns the handle for this slot plus the
    /// removal report when a leaf matched below. The contract on freed
    /// images matches `insert_at`.
    fn remove_at(
        &mut self,
        slot: Handle,
        query: &DnaSequence,
        key: &[u8],
        depth: usize,
    ) -> Result<(Handle, Option<Removed>)> {
        match self.load(slot)? {
            TrieNode::Empty => Ok((slot, None)),
            TrieNode::Leaf {
                payload,
                literal_len,
            } => {
                let resident = self.materialize(payload, literal_len)?;
                if resident.as_str() != query.as_str() {
                    return Ok((slot, None));
                }
                let freed = self.manager.remove(payload)?;
                let info = Removed {
                    stored_bytes: freed as usize + 2,
                    chars: literal_len as usize,
                    address: payload.addr(),
                };
                self.free_node(slot)?;
                Ok((self.flyweight, Some(info)))
            }
            TrieNode::Internal { mut children } => {
                if depth >= key.len() {
                    return Ok((slot, None));
                }
                let idx = branch_index(key[depth])
                    .ok_or_else(|| eyre!("invalid character in trie key"))?;
                let (child, removed) = self.remove_at(children[idx], query, key, depth + 1)?;
                if child == children[idx] {
                    // Nothing below changed; keep this image as-is.
                    return Ok((slot, removed));
                }
                children[idx] = child;
                if let Some(survivor) = self.lone_leaf_child(&children)? {
                    self.free_node(slot)?;
                    return Ok((survivor, removed));
                }
                let rewritten = self.save(&TrieNode::Internal { children })?;
                self.free_node(slot)?;
                Ok((rewritten, removed))
            }
        }
    }

    /// The collapse test: exactly one non-flyweight child, and it is a
    /// leaf.
    fn lone_leaf_child(&mut self, children: &[Handle; CHILD_COUNT]) -> Result<Option<Handle>> {
        let mut lone = None;
        for &child in children {
            if child != self.flyweight {
                if lone.is_some() {
                    return Ok(None);
                }
                lone = Some(child);
            }
        }
        match lone {
            Some(handle) if self.load(handle)?.is_leaf() => Ok(Some(handle)),
            _ => Ok(None),
        }
    }

    fn replace_root(&mut self, new_root: Handle) {
        if new_root != self.root {
            self.root = new_root;
        }
    }

    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn load(&mut self, handle: Handle) -> Result<TrieNode> {
        let bytes = self.manager.get(handle)?;
        TrieNode::decode(&bytes)
    }

    fn save(&mut self, node: &TrieNode) -> Result<Handle> {
        self.manager
            .insert(&node.encode())?
            .ok_or_else(|| eyre!("out of space while rewriting trie nodes"))
    }

    fn free_node(&mut self, handle: Handle) -> Result<()> {
        if handle != self.flyweight {
            self.manager.remove(handle)?;
        }
        Ok(())
    }

    /// Decodes the sequence a leaf refers to.
    pub(crate) fn materialize(&mut self, payload: Handle, literal_len: u16) -> Result<DnaSequence> {
        let bytes = self.manager.get(payload)?;
        Ok(DnaSequence::decode(&bytes, literal_len as usize))
    }
}
