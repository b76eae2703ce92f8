//! Background flusher
//!
//! One dedicated worker thread per store drains the overlay into the engine
//! in atomic batches. Triggers: the interval timer, a demand flush
//! (`flush_now` or a writer at the high-water mark), and shutdown. The stop
//! flag is checked at every wake; shutdown finishes the in-flight commit,
//! performs one final drain, and exits.
//!
//! Batches are issued strictly sequentially: the loop never starts a new
//! commit before the previous one returns, so batches land in issue order.
//!
//! On commit failure the drained batch is re-staged into the overlay
//! (latest-wins against anything staged meanwhile) and the error is parked
//! on the control block for the next user operation to collect.

use crate::store::StoreInner;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// Spawn the flusher thread for `inner`
pub(crate) fn spawn(inner: Arc<StoreInner>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("flaxkv-flush".to_string())
        .spawn(move || run(inner))
        .expect("failed to spawn flusher thread")
}

fn run(inner: Arc<StoreInner>) {
    debug!("flusher started");
    loop {
        {
            let mut ctl = inner.control.lock();
            if ctl.stop {
                break;
            }
            if !ctl.demand {
                let _ = inner
                    .flush_wake
                    .wait_for(&mut ctl, inner.config.flush_interval());
            }
            if ctl.stop {
                break;
            }
            ctl.demand = false;
        }
        flush_once(&inner);
    }
    // Final drain: commit anything staged before the stop flag was honored.
    flush_once(&inner);
    debug!("flusher exited");
}

/// Drain the overlay and commit it as one batch
///
/// The commit gate is taken first so iterator-snapshot construction never
/// observes the window where drained entries are in neither the overlay
/// nor the engine.
pub(crate) fn flush_once(inner: &StoreInner) {
    let _gate = inner.commit_gate.write();
    let (batch, watermark) = {
        let mut overlay = inner.overlay.lock();
        let batch = overlay.drain();
        (batch, overlay.next_seq())
    };

    if batch.is_empty() {
        let mut ctl = inner.control.lock();
        if watermark > ctl.flushed_seq {
            ctl.flushed_seq = watermark;
        }
        drop(ctl);
        inner.flush_done.notify_all();
        return;
    }

    match inner.engine.commit_batch(&batch) {
        Ok(()) => {
            debug!(ops = batch.len(), "flush batch committed");
            let mut ctl = inner.control.lock();
            if watermark > ctl.flushed_seq {
                ctl.flushed_seq = watermark;
            }
            ctl.last_error = None;
            drop(ctl);
            inner.flush_done.notify_all();
        }
        Err(e) => {
            error!(error = %e, ops = batch.len(), "flush batch failed, re-staging");
            {
                let mut overlay = inner.overlay.lock();
                overlay.restage(batch);
            }
            let mut ctl = inner.control.lock();
            ctl.last_error = Some(e.clone());
            ctl.pending_error = Some(e);
            drop(ctl);
            inner.flush_done.notify_all();
        }
    }
}
