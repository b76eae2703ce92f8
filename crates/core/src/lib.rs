//! Core types for FlaxKV
//!
//! This crate defines:
//! - [`Key`] and its canonical, self-describing byte encoding
//! - [`Value`], [`NdArray`], and the MessagePack value codec
//! - [`Limits`] for engine-dependent size ceilings
//! - the unified [`Error`]/[`Result`] pair used by every layer
//!
//! Everything here is pure: no I/O, no locks, no global state. The codec
//! functions are total over their supported domain and deterministic, which
//! is what makes key identity and round-trip correctness possible one layer
//! up.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod limits;
pub mod value;

pub use error::{Error, Result};
pub use key::{decode_key, encode_key, encode_key_with_limits, Key};
pub use limits::{Limits, DEFAULT_MAX_KEY_BYTES};
pub use value::{decode_value, encode_value, Dtype, NdArray, Value, CODEC_VERSION};
