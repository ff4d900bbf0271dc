//! Stock Refresh Background Task
//!
//! Periodically calls [`CatalogClient::refresh_stock`] so the cached product
//! list and per-product entries stay warm, independently of request traffic.
//!
//! # Cadence
//!
//! - After a successful refresh: wait `interval` (default 5 minutes)
//! - After a failed refresh: wait `error_interval` (default 30 seconds)
//!
//! The delay is fixed, not exponential; the catalog client's own retry policy
//! already backs off inside each refresh. Shutdown is observed while a
//! refresh is in flight and while sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::shutdown_requested;
use crate::catalog::{CatalogClient, RefresherClaim};
use crate::config::StockRefreshConfig;

/// Errors starting the refresher.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Stock refresher is already running for this catalog client")]
    AlreadyRunning,
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for refresh activity.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
    /// Refresh attempts started
    pub cycles: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    /// Products returned by the last successful refresh
    pub last_product_count: AtomicU64,
}

impl RefreshMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> RefreshSnapshot {
        RefreshSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_product_count: self.last_product_count.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of refresh counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSnapshot {
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_product_count: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background stock refresher. At most one runs per catalog client.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let refresher = StockRefresher::new(catalog.clone(), config.refresh);
/// let metrics = refresher.metrics();
/// let handle = refresher.spawn(shutdown_rx)?;
///
/// // Later, trigger shutdown
/// let _ = shutdown_tx.send(true);
/// handle.await?;
/// ```
pub struct StockRefresher {
    catalog: CatalogClient,
    config: StockRefreshConfig,
    metrics: Arc<RefreshMetrics>,
}

impl StockRefresher {
    #[must_use]
    pub fn new(catalog: CatalogClient, config: StockRefreshConfig) -> Self {
        Self {
            catalog,
            config,
            metrics: Arc::new(RefreshMetrics::new()),
        }
    }

    /// Shared handle to this refresher's counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<RefreshMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the refresh loop on the current task until shutdown.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if another refresher is
    /// running for the same catalog client.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        let claim = self
            .catalog
            .claim_refresher()
            .ok_or(SchedulerError::AlreadyRunning)?;

        self.run_claimed(claim, shutdown).await;
        Ok(())
    }

    /// Spawn the refresh loop as a tokio task.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if another refresher is
    /// running for the same catalog client.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Result<JoinHandle<()>, SchedulerError> {
        let claim = self
            .catalog
            .claim_refresher()
            .ok_or(SchedulerError::AlreadyRunning)?;

        Ok(tokio::spawn(self.run_claimed(claim, shutdown)))
    }

    async fn run_claimed(self, _claim: RefresherClaim, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            error_interval_secs = self.config.error_interval.as_secs(),
            "Stock refresher started"
        );

        loop {
            let delay = tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown) => break,
                delay = self.refresh_once() => delay,
            };

            tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown) => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            cycles = snapshot.cycles,
            successes = snapshot.successes,
            failures = snapshot.failures,
            "Stock refresher stopped"
        );
    }

    /// One refresh. Returns how long to wait before the next one.
    async fn refresh_once(&self) -> Duration {
        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);

        match self.catalog.refresh_stock().await {
            Ok(count) => {
                self.metrics.successes.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .last_product_count
                    .store(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
                debug!(
                    count,
                    next_in_secs = self.config.interval.as_secs(),
                    "Stock refresh cycle completed"
                );
                self.config.interval
            }
            Err(e) => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = %e,
                    retry_in_secs = self.config.error_interval.as_secs(),
                    "Stock refresh failed"
                );
                self.config.error_interval
            }
        }
    }
}
