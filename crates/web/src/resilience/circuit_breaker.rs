//! # Circuit Breaker
//!
//! Classic three-state breaker guarding calls to the catalog API:
//! Closed (normal operation), Open (failing fast), and Half-Open (one probe
//! call decides whether to close or reopen).
//!
//! The breaker does not run operations itself. Callers take a [`Permit`]
//! before each network attempt and report the outcome through it; this keeps
//! the breaker usable from the retry loop, where every attempt counts.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use super::metrics::ResilienceMetrics;

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Cool-down elapsed - a single probe call is allowed
    HalfOpen,
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen {
    /// Time left until a probe will be allowed, if known
    pub retry_after: Option<Duration>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging
    name: String,
    failure_threshold: u32,
    break_duration: Duration,
    state: Mutex<BreakerState>,
    metrics: Arc<ResilienceMetrics>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    ///
    /// `failure_threshold` is clamped to at least one.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        break_duration: Duration,
        metrics: Arc<ResilienceMetrics>,
    ) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold,
            break_secs = break_duration.as_secs(),
            "Circuit breaker initialized"
        );

        Self {
            name,
            failure_threshold: failure_threshold.max(1),
            break_duration,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            metrics,
        }
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. An open circuit whose cool-down has elapsed still
    /// reports `Open` until the next call turns it half-open.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Ask to make one call.
    ///
    /// # Errors
    ///
    /// Returns `CircuitOpen` while the circuit is open, or while a half-open
    /// probe is already in flight.
    pub fn try_acquire(&self) -> Result<Permit<'_>, CircuitOpen> {
        let mut guard = self.state.lock();

        match guard.state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::Open => {
                let elapsed = guard.opened_at.map_or(self.break_duration, |at| at.elapsed());
                if elapsed >= self.break_duration {
                    guard.state = CircuitState::HalfOpen;
                    guard.probe_in_flight = true;
                    info!(component = %self.name, "Circuit breaker half-open (probing)");
                    Ok(Permit::new(self, true))
                } else {
                    Err(CircuitOpen {
                        retry_after: Some(self.break_duration.saturating_sub(elapsed)),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if guard.probe_in_flight {
                    Err(CircuitOpen { retry_after: None })
                } else {
                    guard.probe_in_flight = true;
                    Ok(Permit::new(self, true))
                }
            }
        }
    }

    fn on_success(&self) {
        let mut guard = self.state.lock();
        guard.consecutive_failures = 0;

        if guard.state == CircuitState::HalfOpen {
            guard.state = CircuitState::Closed;
            guard.opened_at = None;
            guard.probe_in_flight = false;
            ResilienceMetrics::incr(&self.metrics.circuit_closed);
            info!(component = %self.name, "Circuit breaker reset, requests resumed");
        }
    }

    fn on_failure(&self) {
        let mut guard = self.state.lock();

        match guard.state {
            CircuitState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.failure_threshold {
                    self.open(&mut guard);
                }
            }
            CircuitState::HalfOpen => self.open(&mut guard),
            // Late result from a call admitted before the circuit opened
            CircuitState::Open => {}
        }
    }

    fn open(&self, guard: &mut BreakerState) {
        guard.state = CircuitState::Open;
        guard.opened_at = Some(Instant::now());
        guard.probe_in_flight = false;
        ResilienceMetrics::incr(&self.metrics.circuit_opened);
        warn!(
            component = %self.name,
            consecutive_failures = guard.consecutive_failures,
            break_secs = self.break_duration.as_secs(),
            "Circuit breaker tripped, requests suspended"
        );
    }

    /// Probe dropped without a verdict (e.g. the caller was cancelled).
    fn release_probe(&self) {
        let mut guard = self.state.lock();
        if guard.state == CircuitState::HalfOpen {
            guard.probe_in_flight = false;
        }
    }
}

/// Admission for one call. Report the outcome with [`Permit::success`] or
/// [`Permit::failure`]; dropping it unreported frees a half-open probe slot.
#[must_use = "report the call outcome through the permit"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    reported: bool,
}

impl<'a> Permit<'a> {
    const fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            reported: false,
        }
    }

    /// Whether this call is the half-open probe.
    #[must_use]
    pub const fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.reported = true;
        self.breaker.on_success();
    }

    pub fn failure(mut self) {
        self.reported = true;
        self.breaker.on_failure();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.reported {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, break_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            threshold,
            Duration::from_secs(break_secs),
            Arc::new(ResilienceMetrics::new()),
        )
    }

    fn fail(breaker: &CircuitBreaker, times: u32) {
        for _ in 0..times {
            breaker.try_acquire().unwrap().failure();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_consecutive_failures() {
        let breaker = breaker(5, 30);

        fail(&breaker, 4);
        assert_eq!(breaker.state(), CircuitState::Closed);

        fail(&breaker, 1);
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected = breaker.try_acquire().err().unwrap();
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(30)));
        assert_eq!(breaker.metrics.snapshot().circuit_opened, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let breaker = breaker(3, 30);

        fail(&breaker, 2);
        breaker.try_acquire().unwrap().success();
        fail(&breaker, 2);

        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_after_cooldown_closes_on_success() {
        let breaker = breaker(1, 30);
        fail(&breaker, 1);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(breaker.try_acquire().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        let probe = breaker.try_acquire().unwrap();
        assert!(probe.is_probe());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Only one probe at a time
        assert!(breaker.try_acquire().is_err());

        probe.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics.snapshot().circuit_closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens_for_full_window() {
        let breaker = breaker(1, 30);
        fail(&breaker, 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        breaker.try_acquire().unwrap().failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(10)).await;
        let rejected = breaker.try_acquire().err().unwrap();
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(20)));
        assert_eq!(breaker.metrics.snapshot().circuit_opened, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_frees_slot() {
        let breaker = breaker(1, 30);
        fail(&breaker, 1);
        tokio::time::advance(Duration::from_secs(30)).await;

        drop(breaker.try_acquire().unwrap());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let probe = breaker.try_acquire().unwrap();
        assert!(probe.is_probe());
        probe.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
