use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where a batch tick currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickPhase {
    Idle,
    Collecting,
    Dispatching,
    Committing,
}

/// Shared cancellation flag, checked before each character.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Aggregate result of one batch tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub boundary: i64,
    pub seed: u64,
    /// Ids in the point-in-time snapshot.
    pub collected: usize,
    pub succeeded: usize,
    /// No longer due, or changed by another writer since collection.
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Characters whose affinity class was replaced by the default.
    pub fallbacks: usize,
    pub sessions: u64,
    pub experience_granted: u64,
}

impl TickReport {
    pub fn new(boundary: i64, seed: u64) -> Self {
        Self {
            boundary,
            seed,
            ..Self::default()
        }
    }

    pub fn accounted(&self) -> usize {
        self.succeeded + self.skipped + self.failed + self.cancelled
    }
}
