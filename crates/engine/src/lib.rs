//! Engine adapters for FlaxKV
//!
//! This crate abstracts the backing engine behind a minimal ordered-KV
//! surface: point get, ordered scan, atomic batch commit, stat, and
//! drop-all. Two backends are provided:
//!
//! - [`BtreeEngine`], a memory-mapped-B+tree-class store (redb). Read
//!   transactions give MVCC snapshots, so iteration observes a stable view
//!   while a batch commits.
//! - [`LsmEngine`], an LSM-class store (sled). Its iterator is live, so
//!   the store layer wraps iteration in a reader lock instead.
//!
//! Keys and values cross this boundary as plain byte slices; all encoding
//! happens above. Engine-defined key order is lexicographic byte order for
//! both backends.
//!
//! The crate also owns the per-directory store [`header`]: a small record of
//! engine kind, codec version, and creation time, read at open to detect
//! incompatible reuse of a database directory.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod btree;
pub mod header;
pub mod lsm;

pub use btree::BtreeEngine;
pub use header::{read_header, write_header, Header, FORMAT_VERSION};
pub use lsm::LsmEngine;

use flaxkv_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which embedded engine backs a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Memory-mapped B+tree (redb)
    MmapBtree,
    /// Log-structured merge tree (sled)
    Lsm,
}

impl EngineKind {
    /// Single-byte tag used in the store header
    pub fn as_byte(self) -> u8 {
        match self {
            EngineKind::MmapBtree => 1,
            EngineKind::Lsm => 2,
        }
    }

    /// Inverse of [`as_byte`](Self::as_byte)
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(EngineKind::MmapBtree),
            2 => Some(EngineKind::Lsm),
            _ => None,
        }
    }

    /// Open an engine of this kind rooted in `dir`
    ///
    /// `cache_hint` sizes the engine's in-memory cache when given.
    pub fn open(self, dir: &Path, cache_hint: Option<usize>) -> Result<Box<dyn Engine>> {
        match self {
            EngineKind::MmapBtree => Ok(Box::new(BtreeEngine::open(dir, cache_hint)?)),
            EngineKind::Lsm => Ok(Box::new(LsmEngine::open(dir, cache_hint)?)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::MmapBtree => write!(f, "mmap_btree"),
            EngineKind::Lsm => write!(f, "lsm"),
        }
    }
}

/// One operation in an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or replace a record
    Put {
        /// Encoded key
        key: Vec<u8>,
        /// Encoded value
        value: Vec<u8>,
    },
    /// Remove a record if present
    Delete {
        /// Encoded key
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// The encoded key this operation targets
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } => key,
            BatchOp::Delete { key } => key,
        }
    }
}

/// Engine size statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStat {
    /// Number of records in the engine
    pub entry_count: u64,
    /// On-disk footprint in bytes
    pub size_bytes: u64,
}

/// Lazy, finite, key-ordered scan over engine records
///
/// The iterator owns whatever engine resources it needs (read transaction,
/// page cache pins); dropping it releases them.
pub type EngineIter = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + Send>;

/// Uniform surface over an embedded ordered key-value engine
///
/// Requirements on implementors: `commit_batch` is atomic and durable once
/// it returns `Ok`; iteration order is stable lexicographic byte order;
/// reads may run concurrently with a committing batch.
pub trait Engine: Send + Sync {
    /// Point lookup
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Whether a record exists for `key`
    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Ordered scan over all records
    fn iter(&self) -> Result<EngineIter>;

    /// Apply `batch` atomically; durable when this returns `Ok`
    ///
    /// Operations apply in slice order, so a later op on the same key wins.
    fn commit_batch(&self, batch: &[BatchOp]) -> Result<()>;

    /// Record count and on-disk size
    fn stat(&self) -> Result<EngineStat>;

    /// Remove every record (rebuild-on-open)
    fn drop_all(&self) -> Result<()>;

    /// Whether [`iter`](Self::iter) observes a stable snapshot
    ///
    /// When false, the store serializes batch commits against open
    /// iterators with a reader lock.
    fn snapshot_iteration(&self) -> bool;
}
