//! # Resilience Module
//!
//! Wraps every catalog API call with retry and a circuit breaker.
//!
//! ## Architecture
//!
//! - **Retry** (outer): transient outcomes are network failures, 5xx, 408 and
//!   404. Up to `max_retries` more attempts with `unit * 2^attempt` backoff.
//!   Once retries run out the last outcome is returned as-is, so a final 404
//!   or 503 reaches the caller as a response.
//! - **Circuit breaker** (inner, per attempt): network failures, 5xx and 408
//!   count as failures; any other response counts as success. After
//!   `failure_threshold` consecutive failures the circuit opens and attempts
//!   fail fast with [`PolicyError::CircuitOpen`] for `break_duration`. A
//!   rejected attempt is terminal: the retry loop does not wait it out.
//!
//! ## Pluggability
//!
//! Callers depend on the [`UpstreamPolicy`] trait, not on the concrete
//! policy. [`ResiliencePolicy`] is the default implementation; a client can
//! be assembled with any other.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let policy: Arc<dyn UpstreamPolicy> =
//!     Arc::new(ResiliencePolicy::new("catalog_api", &ResilienceConfig::default()));
//! let response = policy.send(transport.as_ref(), &request).await?;
//! ```

pub mod circuit_breaker;
pub mod metrics;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitOpen, CircuitState};
pub use metrics::{ResilienceMetrics, ResilienceSnapshot};
pub use retry::RetryPolicy;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResilienceConfig;
use crate::upstream::{HttpTransport, TransportError, UpstreamRequest, UpstreamResponse};

/// Terminal failure of a guarded call.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The circuit is open; the network was not touched.
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// The last attempt failed at the network level.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Guards every call to one upstream dependency.
#[async_trait]
pub trait UpstreamPolicy: Send + Sync {
    /// Send `request` through `transport` under this policy.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::CircuitOpen` if the call was refused without
    /// touching the network, or `PolicyError::Transport` if the last attempt
    /// failed at the network level.
    async fn send(
        &self,
        transport: &dyn HttpTransport,
        request: &UpstreamRequest,
    ) -> Result<UpstreamResponse, PolicyError>;

    fn circuit_state(&self) -> CircuitState;

    fn metrics(&self) -> ResilienceSnapshot;
}

/// Retry plus circuit breaker for one upstream dependency.
///
/// Share one instance across every caller of the same upstream so the
/// breaker sees all failures.
#[derive(Debug)]
pub struct ResiliencePolicy {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    metrics: Arc<ResilienceMetrics>,
}

impl ResiliencePolicy {
    #[must_use]
    pub fn new(name: impl Into<String>, config: &ResilienceConfig) -> Self {
        let metrics = Arc::new(ResilienceMetrics::new());
        let breaker = CircuitBreaker::new(
            name,
            config.failure_threshold,
            config.break_duration,
            Arc::clone(&metrics),
        );

        Self {
            retry: RetryPolicy::from_config(config),
            breaker,
            metrics,
        }
    }

    /// Whether the breaker counts this status as a failed attempt.
    fn is_breaker_failure(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
    }

    /// Run `attempt` under retry and circuit breaker.
    ///
    /// `attempt` is invoked once per network attempt and must build a fresh
    /// request future each time.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::CircuitOpen` if the breaker rejects an attempt,
    /// or `PolicyError::Transport` if the last attempt failed at the network
    /// level.
    pub async fn execute<F, Fut>(&self, mut attempt: F) -> Result<UpstreamResponse, PolicyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<UpstreamResponse, TransportError>>,
    {
        let mut retries = 0;

        loop {
            let Ok(permit) = self.breaker.try_acquire() else {
                ResilienceMetrics::incr(&self.metrics.rejected);
                debug!(component = %self.breaker.name(), "Call rejected by open circuit");
                return Err(PolicyError::CircuitOpen {
                    component: self.breaker.name().to_string(),
                });
            };

            ResilienceMetrics::incr(&self.metrics.attempts);
            let outcome = attempt().await;

            let transient = match &outcome {
                Ok(response) => {
                    if Self::is_breaker_failure(response.status) {
                        permit.failure();
                    } else {
                        permit.success();
                    }
                    RetryPolicy::is_transient_status(response.status)
                }
                Err(error) => {
                    if error.is_transient() {
                        permit.failure();
                    } else {
                        permit.success();
                    }
                    error.is_transient()
                }
            };

            if !transient || retries >= self.retry.max_retries() {
                return outcome.map_err(PolicyError::from);
            }

            retries += 1;
            let delay = self.retry.delay_for(retries);
            ResilienceMetrics::incr(&self.metrics.retries);
            match &outcome {
                Ok(response) => warn!(
                    component = %self.breaker.name(),
                    attempt = retries,
                    status = %response.status,
                    delay_ms = delay.as_millis(),
                    "Retrying catalog API request"
                ),
                Err(error) => warn!(
                    component = %self.breaker.name(),
                    attempt = retries,
                    error = %error,
                    delay_ms = delay.as_millis(),
                    "Retrying catalog API request"
                ),
            }

            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UpstreamPolicy for ResiliencePolicy {
    async fn send(
        &self,
        transport: &dyn HttpTransport,
        request: &UpstreamRequest,
    ) -> Result<UpstreamResponse, PolicyError> {
        self.execute(|| transport.send(request)).await
    }

    fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    fn metrics(&self) -> ResilienceSnapshot {
        self.metrics.snapshot()
    }
}
