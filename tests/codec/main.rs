//! Codec Integration Tests
//!
//! Round-trip determinism for keys and values through the public API,
//! including the property-based sweep.

mod keys;
mod props;
mod values;
