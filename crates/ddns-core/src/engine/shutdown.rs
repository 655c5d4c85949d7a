//! Cooperative shutdown signal
//!
//! The flag is written by an out-of-band task (signal handler, test) and read by
//! the updater once per poll quantum. It never interrupts an in-flight call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared shutdown flag
///
/// Clones share the same flag. Triggering is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
