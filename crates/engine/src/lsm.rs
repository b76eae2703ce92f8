//! LSM-class backend (sled)
//!
//! `apply_batch` gives atomicity; an explicit `flush` after each batch gives
//! durability on return, matching the engine contract. sled's iterator is
//! live rather than snapshot-bound, so `snapshot_iteration` is false and
//! the store serializes batch commits against open iterators.

use crate::{BatchOp, Engine, EngineIter, EngineStat};
use flaxkv_core::{Error, Result};
use std::path::Path;

/// Subdirectory holding the sled data
pub const LSM_DIR: &str = "lsm";

fn backend_err(e: impl std::fmt::Display) -> Error {
    Error::engine(e.to_string())
}

/// sled-backed engine
pub struct LsmEngine {
    db: sled::Db,
}

impl LsmEngine {
    /// Open (or create) the engine rooted in `dir`
    ///
    /// `cache_hint` sizes sled's page cache in bytes.
    pub fn open(dir: &Path, cache_hint: Option<usize>) -> Result<Self> {
        let mut config = sled::Config::new().path(dir.join(LSM_DIR));
        if let Some(bytes) = cache_hint {
            config = config.cache_capacity(bytes as u64);
        }
        let db = config.open().map_err(backend_err)?;
        Ok(Self { db })
    }
}

impl Engine for LsmEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.db.get(key).map_err(backend_err)?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn contains(&self, key: &[u8]) -> Result<bool> {
        self.db.contains_key(key).map_err(backend_err)
    }

    fn iter(&self) -> Result<EngineIter> {
        Ok(Box::new(self.db.iter().map(|item| {
            item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(backend_err)
        })))
    }

    fn commit_batch(&self, batch: &[BatchOp]) -> Result<()> {
        let mut sled_batch = sled::Batch::default();
        for op in batch {
            match op {
                BatchOp::Put { key, value } => {
                    sled_batch.insert(key.as_slice(), value.as_slice());
                }
                BatchOp::Delete { key } => {
                    sled_batch.remove(key.as_slice());
                }
            }
        }
        self.db.apply_batch(sled_batch).map_err(backend_err)?;
        self.db.flush().map_err(backend_err)?;
        Ok(())
    }

    fn stat(&self) -> Result<EngineStat> {
        let entry_count = self.db.len() as u64;
        let size_bytes = self.db.size_on_disk().map_err(backend_err)?;
        Ok(EngineStat {
            entry_count,
            size_bytes,
        })
    }

    fn drop_all(&self) -> Result<()> {
        self.db.clear().map_err(backend_err)?;
        self.db.flush().map_err(backend_err)?;
        Ok(())
    }

    fn snapshot_iteration(&self) -> bool {
        false
    }
}
