//! Single-flight gate.
//!
//! A capacity-one permit. `try_acquire` never waits: a sweep that finds the
//! gate taken is dropped, not queued. The permit is released when the
//! returned value drops.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct SingleFlight {
    permits: Arc<Semaphore>,
}

/// Proof that the caller is the only one in flight.
#[derive(Debug)]
pub struct FlightPermit {
    _permit: OwnedSemaphorePermit,
}

impl FlightPermit {
    /// Give up the slot now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_acquire(&self) -> Option<FlightPermit> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|p| FlightPermit { _permit: p })
    }

    pub fn is_in_flight(&self) -> bool {
        self.permits.available_permits() == 0
    }
}
