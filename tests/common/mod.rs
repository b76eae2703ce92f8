//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use flaxkv::{EngineKind, Store, StoreConfig};
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Route store logs through the test harness for failure diagnosis.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Both reference engines; most suites run every case against each.
pub const ENGINES: [EngineKind; 2] = [EngineKind::MmapBtree, EngineKind::Lsm];

/// Config tuned for tests: short flush timer, default high-water.
pub fn fast_config(path: &Path, engine: EngineKind) -> StoreConfig {
    StoreConfig::new(path).engine(engine).flush_interval_ms(25)
}

/// Open a store in `dir` with the test config.
pub fn open_store(dir: &TempDir, engine: EngineKind) -> Store {
    init_tracing();
    Store::open(fast_config(dir.path(), engine)).expect("failed to open store")
}

/// Close `store` and open the same directory again.
pub fn reopen(store: Store, dir: &TempDir, engine: EngineKind) -> Store {
    store.close().expect("failed to close store");
    drop(store);
    open_store(dir, engine)
}
