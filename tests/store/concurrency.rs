//! Parallel-thread behavior: read-your-writes and per-key last-write-wins.

use crate::common::{open_store, ENGINES};
use flaxkv::Value;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const WRITES_PER_THREAD: i64 = 1250;

#[test]
fn read_your_writes_on_private_keys() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir, engine));
        let barrier = Arc::new(Barrier::new(THREADS));

        let mut handles = Vec::new();
        for t in 0..THREADS as i64 {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                let key = format!("private:{t}");
                for i in 0..200i64 {
                    store.put(key.as_str(), i).unwrap();
                    // A get issued after our own put must observe it: no
                    // other thread touches this key.
                    assert_eq!(store.get(key.as_str()).unwrap(), Value::Int(i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
        store.close().unwrap();
    }
}

#[test]
fn hammered_shared_key_converges_to_a_last_write() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir, engine));
        let barrier = Arc::new(Barrier::new(THREADS));

        let mut handles = Vec::new();
        for t in 0..THREADS as i64 {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for i in 0..WRITES_PER_THREAD {
                    let value = t * WRITES_PER_THREAD + i;
                    store.put("a", value).unwrap();
                    if i % 64 == 0 {
                        // Any observed value must be one some thread wrote.
                        let seen = store.get("a").unwrap();
                        match seen {
                            Value::Int(v) => {
                                assert!((0..THREADS as i64 * WRITES_PER_THREAD).contains(&v))
                            }
                            other => panic!("unexpected value {other:?}"),
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        store.flush_now().unwrap();

        // The final value is the last write of some thread in a valid
        // linearization.
        let last_writes: Vec<i64> = (0..THREADS as i64)
            .map(|t| t * WRITES_PER_THREAD + (WRITES_PER_THREAD - 1))
            .collect();
        match store.get("a").unwrap() {
            Value::Int(v) => assert!(
                last_writes.contains(&v),
                "final value {v} is not any thread's last write"
            ),
            other => panic!("unexpected value {other:?}"),
        }

        // Exactly one engine record for the hammered key.
        assert_eq!(store.stat().unwrap().engine.entry_count, 1);

        let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
        store.close().unwrap();
    }
}

#[test]
fn writers_and_flusher_agree_under_small_high_water() {
    use flaxkv::{Store, StoreConfig};

    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            Store::open(
                StoreConfig::new(dir.path())
                    .engine(engine)
                    .flush_interval_ms(10)
                    .high_water(16),
            )
            .unwrap(),
        );

        let mut handles = Vec::new();
        for t in 0..4i64 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500i64 {
                    store.put(t * 1000 + i, i).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        store.flush_now().unwrap();
        assert_eq!(store.len().unwrap(), 4 * 500);

        let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
        store.close().unwrap();
    }
}

#[test]
fn concurrent_pop_hands_each_value_to_one_thread() {
    for engine in ENGINES {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir, engine));

        for i in 0..64i64 {
            store.put(i, i).unwrap();
        }

        let winners = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let winners = Arc::clone(&winners);
            handles.push(thread::spawn(move || {
                for i in 0..64i64 {
                    if let Ok(value) = store.pop(i) {
                        winners.lock().push(value);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every key was popped exactly once across all threads.
        let mut values: Vec<_> = winners
            .lock()
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i,
                other => panic!("unexpected value {other:?}"),
            })
            .collect();
        values.sort_unstable();
        assert_eq!(values, (0..64).collect::<Vec<_>>());
        assert_eq!(store.len().unwrap(), 0);

        let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
        store.close().unwrap();
    }
}
