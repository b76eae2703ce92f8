//! Snapshot-consistent iteration over the merged view.

use crate::common::{open_store, ENGINES};
use flaxkv::{Key, Store, StoreConfig, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn iteration_merges_engine_and_overlay_in_key_order() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, engine);

        // Half the keys flushed, half pending, one engine record tombstoned.
        store.put("b", 2i64).unwrap();
        store.put("d", 4i64).unwrap();
        store.flush_now().unwrap();
        store.put("a", 1i64).unwrap();
        store.put("c", 3i64).unwrap();
        store.delete("d").unwrap();

        let items: Vec<_> = store.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(
            items,
            vec![
                (Key::Str("a".into()), Value::Int(1)),
                (Key::Str("b".into()), Value::Int(2)),
                (Key::Str("c".into()), Value::Int(3)),
            ]
        );
        store.close().unwrap();
    }
}

#[test]
fn overlay_value_shadows_engine_record() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, engine);

        store.put("k", "old").unwrap();
        store.flush_now().unwrap();
        store.put("k", "new").unwrap();

        let items: Vec<_> = store.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec![(Key::Str("k".into()), Value::Str("new".into()))]);
        store.close().unwrap();
    }
}

#[test]
fn keys_and_values_adapters_agree_with_items() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, engine);

        for i in 0..10i64 {
            store.put(i, i * 10).unwrap();
        }

        let items: Vec<_> = store.items().unwrap().map(|r| r.unwrap()).collect();
        let keys: Vec<_> = store.keys().unwrap().map(|r| r.unwrap()).collect();
        let values: Vec<_> = store.values().unwrap().map(|r| r.unwrap()).collect();

        assert_eq!(items.len(), 10);
        assert_eq!(keys, items.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>());
        assert_eq!(
            values,
            items.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>()
        );
        store.close().unwrap();
    }
}

#[test]
fn iterator_reflects_state_at_its_start() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        // Large high-water so the mutator never blocks on the barrier while
        // an open iterator delays flushes.
        let store = Arc::new(
            Store::open(
                StoreConfig::new(dir.path())
                    .engine(engine)
                    .flush_interval_ms(10)
                    .high_water(100_000),
            )
            .unwrap(),
        );

        let pre_existing: BTreeSet<i64> = (0..200).collect();
        for &i in &pre_existing {
            store.put(i, i).unwrap();
        }
        // Some in the engine, some still pending.
        store.flush_within(std::time::Duration::from_secs(10)).unwrap();
        for i in 150..200i64 {
            store.put(i, i + 1).unwrap();
        }

        let iter = store.iter().unwrap();

        // Mutations start only once the snapshot exists.
        let stop = Arc::new(AtomicBool::new(false));
        let mutator = {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut round = 0i64;
                while !stop.load(Ordering::Acquire) {
                    let fresh = 1_000 + round;
                    store.put(fresh, fresh).unwrap();
                    store.put(round % 200, -1i64).unwrap();
                    let _ = store.delete((round + 7) % 200);
                    round += 1;
                }
            })
        };

        let mut seen = BTreeSet::new();
        for item in iter {
            let (key, value) = item.unwrap();
            let k = match key {
                Key::Int(i) => i,
                other => panic!("unexpected key {other:?}"),
            };
            assert!(seen.insert(k), "key {k} appeared twice");
            assert!(
                pre_existing.contains(&k),
                "key {k} was not in the snapshot at iterator start"
            );
            // Values are the ones from the snapshot, not the mutator's.
            let expected = if k >= 150 { k + 1 } else { k };
            assert_eq!(value, Value::Int(expected), "key {k} shows a post-snapshot value");
        }
        stop.store(true, Ordering::Release);
        mutator.join().unwrap();

        // No pre-existing key was skipped.
        assert_eq!(seen, pre_existing);

        let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
        store.close().unwrap();
    }
}

#[test]
fn empty_iteration_yields_nothing() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, engine);
        assert_eq!(store.iter().unwrap().count(), 0);
        store.close().unwrap();
    }
}
