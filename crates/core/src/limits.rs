//! Size limits enforced by the codec
//!
//! Keys travel through the backing engine verbatim, so their encoded size is
//! bounded by the most restrictive engine we target. A memory-mapped B+tree
//! in the LMDB family caps keys at 511 bytes; that is the default ceiling.

use serde::{Deserialize, Serialize};

/// Default maximum encoded key length in bytes
pub const DEFAULT_MAX_KEY_BYTES: usize = 511;

/// Configurable size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum encoded key length in bytes
    pub max_key_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_key_bytes: DEFAULT_MAX_KEY_BYTES,
        }
    }
}
