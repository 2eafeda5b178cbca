//! Cooperative cancellation, checked at iteration boundaries only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle; cancelling any clone cancels them all
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation for every clone. A cancelled token
    /// stays cancelled until this is called.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
