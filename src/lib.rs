//! # dnadb - Embedded DNA Sequence Store
//!
//! dnadb is a single-process storage engine that indexes variable-length
//! DNA sequences (alphabet {A, C, G, T}) in a five-way radix trie whose
//! nodes and payloads are persisted in a single backing file. It supports
//! insert, remove, exact and prefix search, and structural print.
//!
//! ## Quick Start
//!
//! ```ignore
//! use dnadb::config::StoreConfig;
//! use dnadb::storage::MemManager;
//! use dnadb::trie::DnaTrie;
//! use dnadb::sequence::DnaSequence;
//!
//! let config = StoreConfig::with_cache(4, 64);
//! let (manager, resume) = MemManager::open("dnadb.pool".as_ref(), &config)?;
//! let mut trie = DnaTrie::open(manager, resume)?;
//!
//! trie.insert(&DnaSequence::new("ACGT")?)?;
//! let hits = trie.search(&DnaSequence::new("AC")?, false)?;
//! trie.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      Controller (dispatch/report)    │
//! ├─────────────────────────────────────┤
//! │       DNA Trie (5-way radix)         │
//! ├─────────────────────────────────────┤
//! │   MemManager (alloc/free by handle)  │
//! ├──────────────────┬──────────────────┤
//! │    Free List     │   Memory Pool     │
//! ├──────────────────┴──────────────────┤
//! │     Buffer Pool (LRU block cache)    │
//! ├─────────────────────────────────────┤
//! │           Backing file               │
//! └─────────────────────────────────────┘
//! ```
//!
//! Every trie node is itself a variable-length record in the pool,
//! addressed by handle, so each insert or remove is a cascade of record
//! allocations, frees, and boundary merges that exercises the allocator
//! and the cache together.
//!
//! ## Module Overview
//!
//! - [`storage`]: buffer pool, memory pool, free list, allocator
//! - [`trie`]: persisted trie, node codec, structural printing
//! - [`sequence`]: DNA sequence type and its packed 2-bit codec
//! - [`command`] / [`controller`]: command-file parsing and dispatch
//! - [`config`]: constants and runtime configuration
//!
//! ## Concurrency
//!
//! The engine is strictly single-threaded: operations are synchronous and
//! run to completion in arrival order. Nothing here is `Sync`-aware by
//! design.

pub mod command;
pub mod config;
pub mod controller;
pub mod sequence;
pub mod storage;
pub mod trie;

pub use command::{parse_line, Command, ParsedLine};
pub use config::StoreConfig;
pub use controller::Controller;
pub use sequence::DnaSequence;
pub use storage::{BootState, CacheStats, Handle, MemManager};
pub use trie::{DnaTrie, InsertOutcome, PrintMode, RemoveOutcome, SearchOutcome};
