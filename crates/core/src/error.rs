//! Error types for FlaxKV
//!
//! This module defines the unified error type used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Error Categories
//!
//! - **Not Found**: key missing on read or delete
//! - **Encoding**: codec failure on a key or value
//! - **Engine**: backing engine I/O, quota, or commit failure
//! - **Corruption**: fatal at open (bad header, engine/codec mismatch)
//! - **Closed / Timeout / CapacityExceeded**: store lifecycle and
//!   backpressure conditions
//!
//! All variants carry owned string payloads so the error is `Clone`. The
//! flusher records failures on an error channel that is polled by the next
//! user operation; a non-`Clone` error could not cross that channel.

use thiserror::Error;

/// Result type alias for FlaxKV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the FlaxKV store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Key not found on read or delete
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Codec failure on a key or value
    #[error("encoding error: {reason}")]
    Encoding {
        /// What the codec rejected
        reason: String,
    },

    /// Backing engine failure (I/O, quota, commit)
    #[error("engine error: {cause}")]
    Engine {
        /// Underlying engine failure
        cause: String,
    },

    /// Data corruption or incompatible on-disk state detected at open
    #[error("corruption: {0}")]
    Corruption(String),

    /// Operation on a closed store
    #[error("store is closed")]
    Closed,

    /// Bounded wait exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// Overlay is at its high-water mark and the flusher cannot make progress
    #[error("write buffer full and flush failing: {cause}")]
    CapacityExceeded {
        /// Last error reported by the flusher
        cause: String,
    },
}

impl Error {
    /// Construct an `Encoding` error
    pub fn encoding(reason: impl Into<String>) -> Self {
        Error::Encoding {
            reason: reason.into(),
        }
    }

    /// Construct an `Engine` error
    pub fn engine(cause: impl Into<String>) -> Self {
        Error::Engine {
            cause: cause.into(),
        }
    }

    /// Construct a `Corruption` error
    pub fn corruption(message: impl Into<String>) -> Self {
        Error::Corruption(message.into())
    }

    /// Check whether this error means "key absent"
    ///
    /// Used by callers that treat a missing key as a normal outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Engine {
            cause: e.to_string(),
        }
    }
}
