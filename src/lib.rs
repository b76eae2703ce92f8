//! # FlaxKV
//!
//! A persistent key-value store that behaves like a mapping while keeping
//! write latency near memory speed. Writes stage in an in-memory overlay
//! and return immediately; a background flusher drains the overlay into an
//! embedded ordered engine in atomic batches; reads consult the overlay
//! first, so a value you just wrote is always the value you read back.
//!
//! # Quick Start
//!
//! ```no_run
//! use flaxkv::{Store, StoreConfig, Value};
//!
//! fn main() -> flaxkv::Result<()> {
//!     let db = Store::open(StoreConfig::new("./my-data"))?;
//!
//!     db.put("user:name", "Alice")?;
//!     assert_eq!(db.get("user:name")?, Value::Str("Alice".into()));
//!
//!     // Keys are typed: integer 1, float 1.0 and text "1" are distinct.
//!     db.put(1i64, "int")?;
//!     db.put(1.0, "float")?;
//!
//!     db.flush_now()?; // force durability now instead of on the timer
//!     db.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Surface
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `put`, `update` | Stage in the overlay, return immediately |
//! | `get`, `contains`, `len` | Merged view: overlay first, engine fallback |
//! | `delete`, `pop`, `setdefault` | Per-key atomic read-modify-write |
//! | `iter`, `items`, `keys`, `values` | Snapshot-consistent ordered scan |
//! | `flush_now`, `write_immediately` | Block until issued writes are durable |
//! | `close` | Final drain, idempotent; also runs on drop |
//!
//! Two embedded engines are supported, selected at open time via
//! [`EngineKind`]: a memory-mapped-B+tree-class store and an LSM-class
//! store. [`close_all`] closes every store still open in the process, in
//! reverse open order.

pub use flaxkv_core::{
    decode_key, decode_value, encode_key, encode_value, Dtype, Error, Key, Limits, NdArray,
    Result, Value, CODEC_VERSION,
};
pub use flaxkv_engine::{BatchOp, Engine, EngineIter, EngineKind, EngineStat};
pub use flaxkv_store::{close_all, Store, StoreConfig, StoreIter, StoreStat};
