//! In-memory delta against the engine
//!
//! The overlay is two associative containers keyed by encoded-key bytes: a
//! write buffer (key → pending value) and a tombstone set (key → deleted).
//! A key lives in at most one of the two at any instant; staging a put or a
//! delete for a key replaces whatever was staged before.
//!
//! Flush batches must apply in staging order, and hash maps do not promise
//! one, so every staging also records `(key, seq)` in an insertion-order
//! queue. A key staged twice leaves a stale queue record behind; `drain`
//! skips records whose seq no longer matches the live entry, so each key
//! contributes exactly one op, positioned at its latest staging.

use flaxkv_engine::BatchOp;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, VecDeque};

/// Result of consulting the overlay for one key
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A put is pending; the encoded value is staged here
    Hit(&'a [u8]),
    /// A delete is pending; the key is logically absent
    Tombstoned,
    /// The overlay knows nothing; fall through to the engine
    Miss,
}

struct BufferedPut {
    value: Vec<u8>,
    seq: u64,
}

/// Write buffer plus tombstone set
#[derive(Default)]
pub struct Overlay {
    buffer: FxHashMap<Vec<u8>, BufferedPut>,
    tombstones: FxHashMap<Vec<u8>, u64>,
    order: VecDeque<(Vec<u8>, u64)>,
    next_seq: u64,
}

impl Overlay {
    /// Stage a put, replacing any pending op for the key
    pub fn stage_put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.tombstones.remove(&key);
        let seq = self.bump();
        self.order.push_back((key.clone(), seq));
        self.buffer.insert(key, BufferedPut { value, seq });
    }

    /// Stage a delete, replacing any pending op for the key
    pub fn stage_delete(&mut self, key: Vec<u8>) {
        self.buffer.remove(&key);
        let seq = self.bump();
        self.order.push_back((key.clone(), seq));
        self.tombstones.insert(key, seq);
    }

    /// Three-valued lookup
    pub fn lookup(&self, key: &[u8]) -> Lookup<'_> {
        if let Some(put) = self.buffer.get(key) {
            return Lookup::Hit(&put.value);
        }
        if self.tombstones.contains_key(key) {
            return Lookup::Tombstoned;
        }
        Lookup::Miss
    }

    /// Whether the key has any pending op
    ///
    /// Staging over an existing entry never grows the overlay, so callers
    /// at the high-water mark may still replace entries.
    pub fn contains_entry(&self, key: &[u8]) -> bool {
        self.buffer.contains_key(key) || self.tombstones.contains_key(key)
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.buffer.len() + self.tombstones.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.tombstones.is_empty()
    }

    /// Watermark: every staged entry has a seq strictly below this
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Point-in-time view for merge-scan, sorted by encoded key
    ///
    /// `Some(value)` is a pending put, `None` a tombstone. The view is
    /// detached: later stagings do not alter it.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        let mut view = BTreeMap::new();
        for (key, put) in &self.buffer {
            view.insert(key.clone(), Some(put.value.clone()));
        }
        for key in self.tombstones.keys() {
            view.insert(key.clone(), None);
        }
        view
    }

    /// Detach everything as a commit-ready batch in staging order
    pub fn drain(&mut self) -> Vec<BatchOp> {
        let mut ops = Vec::with_capacity(self.len());
        for (key, seq) in self.order.drain(..) {
            if self.buffer.get(&key).is_some_and(|p| p.seq == seq) {
                let put = self.buffer.remove(&key).expect("checked above");
                ops.push(BatchOp::Put {
                    key,
                    value: put.value,
                });
            } else if self.tombstones.get(&key) == Some(&seq) {
                self.tombstones.remove(&key);
                ops.push(BatchOp::Delete { key });
            }
            // Stale record: the key was re-staged later; its live record
            // appears further down the queue.
        }
        debug_assert!(self.buffer.is_empty() && self.tombstones.is_empty());
        ops
    }

    /// Put a failed batch back, preserving per-key latest-wins
    ///
    /// Ops whose key was re-staged since the drain are discarded (the newer
    /// overlay entry wins); the rest re-enter at the front of the queue in
    /// their original relative order, so the next flush still applies them
    /// before anything staged afterwards.
    pub fn restage(&mut self, batch: Vec<BatchOp>) {
        for op in batch.into_iter().rev() {
            let key = op.key().to_vec();
            if self.contains_entry(&key) {
                continue;
            }
            let seq = self.bump();
            self.order.push_front((key.clone(), seq));
            match op {
                BatchOp::Put { value, .. } => {
                    self.buffer.insert(key, BufferedPut { value, seq });
                }
                BatchOp::Delete { .. } => {
                    self.tombstones.insert(key, seq);
                }
            }
        }
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
