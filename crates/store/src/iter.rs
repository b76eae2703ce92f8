//! Merged-view iteration
//!
//! [`StoreIter`] is a two-pointer merge over the engine's ordered scan and
//! a sorted overlay snapshot, keyed by encoded-key bytes. Overlay entries
//! win on equal keys; tombstones suppress engine records. Both sides are
//! captured under the commit gate at construction, so the sequence reflects
//! the store at its first step and never observes later mutations.
//!
//! The sequence is finite and not restartable. The first error (engine or
//! codec) is yielded once, after which the iterator fuses.

use flaxkv_core::{decode_key, decode_value, Key, Result, Value};
use flaxkv_engine::EngineIter;
use parking_lot::RwLockReadGuard;
use std::collections::BTreeMap;

/// Lazy iterator over the merged view, in engine key order
pub struct StoreIter<'a> {
    /// Held for the iterator's lifetime on engines without snapshot reads;
    /// blocks flusher commits while alive.
    _gate: Option<RwLockReadGuard<'a, ()>>,
    engine: EngineIter,
    engine_head: Option<(Vec<u8>, Vec<u8>)>,
    overlay: std::collections::btree_map::IntoIter<Vec<u8>, Option<Vec<u8>>>,
    overlay_head: Option<(Vec<u8>, Option<Vec<u8>>)>,
    fused: bool,
}

impl<'a> StoreIter<'a> {
    pub(crate) fn new(
        gate: Option<RwLockReadGuard<'a, ()>>,
        engine: EngineIter,
        overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> Self {
        Self {
            _gate: gate,
            engine,
            engine_head: None,
            overlay: overlay.into_iter(),
            overlay_head: None,
            fused: false,
        }
    }

    fn fill_heads(&mut self) -> Result<()> {
        if self.engine_head.is_none() {
            match self.engine.next() {
                Some(Ok(pair)) => self.engine_head = Some(pair),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        if self.overlay_head.is_none() {
            self.overlay_head = self.overlay.next();
        }
        Ok(())
    }
}

#[derive(PartialEq)]
enum Side {
    Engine,
    Overlay,
    Both,
}

impl Iterator for StoreIter<'_> {
    type Item = Result<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        loop {
            if let Err(e) = self.fill_heads() {
                self.fused = true;
                return Some(Err(e));
            }

            let side = match (&self.engine_head, &self.overlay_head) {
                (None, None) => return None,
                (Some(_), None) => Side::Engine,
                (None, Some(_)) => Side::Overlay,
                (Some((ek, _)), Some((ok, _))) => match ek.cmp(ok) {
                    std::cmp::Ordering::Less => Side::Engine,
                    std::cmp::Ordering::Greater => Side::Overlay,
                    std::cmp::Ordering::Equal => Side::Both,
                },
            };

            let pair = match side {
                Side::Engine => self.engine_head.take().expect("head checked above"),
                Side::Overlay | Side::Both => {
                    if side == Side::Both {
                        // Overlay wins; drop the shadowed engine record.
                        self.engine_head = None;
                    }
                    let (key, entry) = self.overlay_head.take().expect("head checked above");
                    match entry {
                        Some(value) => (key, value),
                        // Tombstone: the key is logically absent.
                        None => continue,
                    }
                }
            };

            let decoded = decode_key(&pair.0).and_then(|k| Ok((k, decode_value(&pair.1)?)));
            return match decoded {
                Ok(item) => Some(Ok(item)),
                Err(e) => {
                    self.fused = true;
                    Some(Err(e))
                }
            };
        }
    }
}
