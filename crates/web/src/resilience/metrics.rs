//! Counters for resilience events.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the retry loop and the circuit breaker.
///
/// Events never change the outcome of a call; they only feed logs and the
/// catalog health endpoint.
#[derive(Debug, Default)]
pub struct ResilienceMetrics {
    /// Requests actually handed to the transport
    pub attempts: AtomicU64,
    /// Attempts that were followed by a backoff and another attempt
    pub retries: AtomicU64,
    /// Closed/half-open to open transitions
    pub circuit_opened: AtomicU64,
    /// Half-open to closed transitions
    pub circuit_closed: AtomicU64,
    /// Calls rejected without touching the network
    pub rejected: AtomicU64,
}

impl ResilienceMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ResilienceSnapshot {
        ResilienceSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            circuit_opened: self.circuit_opened.load(Ordering::Relaxed),
            circuit_closed: self.circuit_closed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of resilience counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResilienceSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub circuit_opened: u64,
    pub circuit_closed: u64,
    pub rejected: u64,
}
