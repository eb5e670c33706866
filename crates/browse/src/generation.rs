//! Per-context generation counter used to discard superseded fetches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new action, staling every ticket issued before it.
    pub fn advance(&self) -> Ticket {
        let issued = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            counter: self.0.clone(),
            issued,
        }
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Proof that an action was the newest one when it started.
#[derive(Debug, Clone)]
pub struct Ticket {
    counter: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    /// A ticket nothing else can stale, for single-owner use.
    pub fn detached() -> Self {
        Generation::new().advance()
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.issued
    }
}
