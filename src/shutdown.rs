//! Process-wide shutdown coordination.
//! The Ctrl-C handler sets the flag; batch loops check it between items and stop
//! issuing new relocations. Calls already in flight are not aborted.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `request()` is safe to call from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Clear the flag. Embedders running several batches in one process use this between runs.
#[inline]
pub fn reset() {
    SHUTDOWN.store(false, Ordering::Relaxed);
}
