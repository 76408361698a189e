//! Process-wide enqueue ordering
//!
//! Every time a record is placed on (or staged for) a queue it is stamped
//! with the next value of a shared counter. Downstream consumers use the
//! stamp to keep the relative order of records that arrive through
//! different sessions. The only contract is strict monotonicity; gaps are
//! allowed.
//!
//! [`EnqueueSequence::global`] is the one counter the process shares; fresh
//! instances exist for tests that need deterministic stamps.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static GLOBAL: Lazy<Arc<EnqueueSequence>> = Lazy::new(|| Arc::new(EnqueueSequence::new()));

/// Shared, atomically incremented enqueue counter
#[derive(Debug, Default)]
pub struct EnqueueSequence {
    next: AtomicU64,
}

impl EnqueueSequence {
    /// Counter starting at zero
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter whose first value is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// The process-wide sequence every factory stamps from by default
    pub fn global() -> Arc<EnqueueSequence> {
        Arc::clone(&GLOBAL)
    }

    /// Allocate the next stamp
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The value the next call to [`next`](Self::next) will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
