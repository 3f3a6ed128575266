//! Shared batch cancellation flag.
//! Cloned into every worker and into signal handlers; checked at the top of
//! each unit of work so no new operation starts after cancellation.
//!
//! Relaxed atomics are sufficient for a one-way "stop" flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent; safe from signal handlers).
    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
