//! Retry classification and exponential backoff.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::ResilienceConfig;

/// Decides which outcomes are retried and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_retries,
            backoff_unit,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.max_retries, config.backoff_unit)
    }

    /// Retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Statuses worth another attempt: 5xx, 408, and 404.
    ///
    /// 404 is retried because the catalog API serves 404s for products it has
    /// not finished syncing yet.
    #[must_use]
    pub fn is_transient_status(status: StatusCode) -> bool {
        status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::NOT_FOUND
    }

    /// Delay before retry number `attempt` (1-based): `unit * 2^attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.backoff_unit.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}
