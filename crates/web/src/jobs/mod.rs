//! Background tasks.
//!
//! - [`StockRefresher`]: keeps the cached product list warm, one per process
//! - [`spawn_startup_sync`]: best-effort upstream sync at startup (development)
//!
//! Long-lived tasks take a `watch::Receiver<bool>` and stop once it reads
//! `true` or its sender is dropped.

mod startup_sync;
mod stock_refresh;

pub use startup_sync::spawn_startup_sync;
pub use stock_refresh::{RefreshMetrics, RefreshSnapshot, SchedulerError, StockRefresher};

use tokio::sync::watch;

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
