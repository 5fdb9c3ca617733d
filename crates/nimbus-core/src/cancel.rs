//! Cooperative cancellation for in-flight logical calls.
//!
//! A `CancelToken` is handed to the executor and the polling predicate; the
//! retry loop checks it at the top of each iteration and during backoff
//! sleeps. Once a physical attempt is in flight, cancellation takes effect
//! when that attempt completes or the transport times out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; there is no way to un-cancel.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
