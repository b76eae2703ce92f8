//! Process-wide registry of open stores
//!
//! Constructors push a weak handle; [`close_all`] walks the registry in
//! reverse open order and closes whatever is still alive. This is the
//! shutdown-hook half of the lifecycle contract; `Drop` on the façade is
//! the other half and covers the common case. The registry is write-only
//! from constructors and read-only from `close_all`, so there is no other
//! long-lived global state to reason about.

use crate::store::StoreInner;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error};

static OPEN_STORES: Lazy<Mutex<Vec<Weak<StoreInner>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Record a newly opened store
pub(crate) fn register(inner: &Arc<StoreInner>) {
    let mut stores = OPEN_STORES.lock();
    // Keep the list from growing without bound across many open/close cycles.
    stores.retain(|weak| weak.strong_count() > 0);
    stores.push(Arc::downgrade(inner));
}

/// Close every registered store that is still alive, in reverse open order
///
/// Returns the number of stores that were closed. Safe to call more than
/// once; already-closed stores are skipped by `close` itself.
pub fn close_all() -> usize {
    let stores: Vec<Weak<StoreInner>> = {
        let mut registry = OPEN_STORES.lock();
        std::mem::take(&mut *registry)
    };

    let mut closed = 0;
    for weak in stores.iter().rev() {
        if let Some(inner) = weak.upgrade() {
            match inner.close() {
                Ok(()) => closed += 1,
                Err(e) => {
                    error!(error = %e, "error while closing store at shutdown");
                    closed += 1;
                }
            }
        }
    }
    if closed > 0 {
        debug!(count = closed, "closed stores at shutdown");
    }
    closed
}
