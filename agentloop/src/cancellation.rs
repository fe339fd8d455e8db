//! Cooperative cancellation for a single run.
//!
//! The step loop checks the token between steps and before each tool call;
//! the HTTP layer flips it when a client calls `POST /v1/runs/{id}/cancel` or
//! disconnects. Loom itself has no equivalent of this — its graph runs to
//! completion or errors out — so this is new rather than adapted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable flag that a run is in the process of being cancelled.
///
/// `Relaxed` ordering is enough: the flag is advisory (the loop polls it at
/// well-defined points), not a synchronization primitive guarding shared data.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
