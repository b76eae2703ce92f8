//! Memory-mapped-B+tree-class backend (redb)
//!
//! One table holds every record. Read transactions are MVCC snapshots, so
//! `iter` hands out an owned range over a stable view while the flusher
//! commits concurrently; `snapshot_iteration` is therefore true and the
//! store takes no reader lock for this backend.

use crate::{BatchOp, Engine, EngineIter, EngineStat};
use flaxkv_core::{Error, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("flaxkv");

/// Data file name inside the database directory
pub const BTREE_DATA_FILE: &str = "data.redb";

fn backend_err(e: impl std::fmt::Display) -> Error {
    Error::engine(e.to_string())
}

/// redb-backed engine
pub struct BtreeEngine {
    db: Database,
    file: PathBuf,
}

impl BtreeEngine {
    /// Open (or create) the engine rooted in `dir`
    ///
    /// `cache_hint` sizes redb's page cache in bytes.
    pub fn open(dir: &Path, cache_hint: Option<usize>) -> Result<Self> {
        let file = dir.join(BTREE_DATA_FILE);
        let mut builder = Database::builder();
        if let Some(bytes) = cache_hint {
            builder.set_cache_size(bytes);
        }
        let db = builder.create(&file).map_err(backend_err)?;

        // Create the table up front so reads never race its existence.
        let txn = db.begin_write().map_err(backend_err)?;
        {
            txn.open_table(TABLE).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)?;

        Ok(Self { db, file })
    }
}

/// Owned scan over one MVCC read snapshot
///
/// The transaction and table ride along so the snapshot outlives the
/// borrow in `iter`.
struct BtreeIter {
    _txn: redb::ReadTransaction,
    _table: redb::ReadOnlyTable<&'static [u8], &'static [u8]>,
    range: redb::Range<'static, &'static [u8], &'static [u8]>,
}

impl Iterator for BtreeIter {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range.next().map(|item| {
            item.map(|(k, v)| (k.value().to_vec(), v.value().to_vec()))
                .map_err(backend_err)
        })
    }
}

impl Engine for BtreeEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(TABLE).map_err(backend_err)?;
        let value = table.get(key).map_err(backend_err)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn iter(&self) -> Result<EngineIter> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(TABLE).map_err(backend_err)?;
        let range = table.range::<&[u8]>(..).map_err(backend_err)?;
        Ok(Box::new(BtreeIter {
            _txn: txn,
            _table: table,
            range,
        }))
    }

    fn commit_batch(&self, batch: &[BatchOp]) -> Result<()> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = txn.open_table(TABLE).map_err(backend_err)?;
            for op in batch {
                match op {
                    BatchOp::Put { key, value } => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(backend_err)?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice()).map_err(backend_err)?;
                    }
                }
            }
        }
        txn.commit().map_err(backend_err)
    }

    fn stat(&self) -> Result<EngineStat> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(TABLE).map_err(backend_err)?;
        let entry_count = table.len().map_err(backend_err)?;
        let size_bytes = std::fs::metadata(&self.file).map(|m| m.len()).unwrap_or(0);
        Ok(EngineStat {
            entry_count,
            size_bytes,
        })
    }

    fn drop_all(&self) -> Result<()> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        txn.delete_table(TABLE).map_err(backend_err)?;
        {
            txn.open_table(TABLE).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)
    }

    fn snapshot_iteration(&self) -> bool {
        true
    }
}
