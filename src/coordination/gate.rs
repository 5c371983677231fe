//! Counting admission gate for batch tasks

use crate::metrics;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Semaphore that also tracks how many holders are inside, and the peak
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Park until a slot frees up
    pub async fn admit(self: &Arc<Self>) -> Result<Admission, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        metrics::record_task_admitted();

        Ok(Admission {
            gate: self.clone(),
            _permit: permit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders seen so far
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Slot owned by one task; released on drop, including when the task is aborted
pub struct Admission {
    gate: Arc<AdmissionGate>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for Admission {
    fn drop(&mut self) {
        // counter goes down before the permit is handed back
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
        metrics::record_task_released();
    }
}
