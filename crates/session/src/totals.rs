use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Session-wide token counter.
///
/// Only grows, except for [`SessionTotals::reset`] on a full clear and
/// [`SessionTotals::set`] when a saved session is hydrated.
#[derive(Debug, Clone, Default)]
pub struct SessionTotals {
    tokens: Arc<AtomicU64>,
}

impl SessionTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.tokens.load(Ordering::Acquire)
    }

    /// Add `n` tokens and return the new total.
    pub fn add(&self, n: u64) -> u64 {
        self.tokens.fetch_add(n, Ordering::AcqRel) + n
    }

    pub(crate) fn set(&self, n: u64) {
        self.tokens.store(n, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.set(0);
    }
}
