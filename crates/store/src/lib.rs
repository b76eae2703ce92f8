//! Buffered write-coalescing store for FlaxKV
//!
//! This crate composes the pieces above an embedded ordered-KV engine:
//!
//! - [`overlay`]: the in-memory write buffer and tombstone set giving
//!   read-your-writes and merge-on-read
//! - the background flusher draining the overlay into the engine in
//!   atomic batches, on timer, high-water, demand, or shutdown
//! - [`Store`]: the public mapping surface composing codec, overlay,
//!   flusher, and engine under one concurrency discipline
//! - [`close_all`]: the process-wide shutdown hook over all open stores
//!
//! Writes never block on disk I/O (except at the high-water barrier), reads
//! always observe the latest value written by the same process, and an
//! orderly shutdown (explicit `close`, drop, or `close_all`) performs one
//! final drain so no mutation is lost.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod flusher;
pub mod iter;
pub mod overlay;
mod registry;
mod store;

pub use config::StoreConfig;
pub use iter::StoreIter;
pub use registry::close_all;
pub use store::{Store, StoreStat};
