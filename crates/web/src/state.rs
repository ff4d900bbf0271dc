//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::config::AppConfig;
use crate::jobs::RefreshMetrics;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    catalog: CatalogClient,
    refresh_metrics: Arc<RefreshMetrics>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, catalog: CatalogClient, refresh_metrics: Arc<RefreshMetrics>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                refresh_metrics,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog API client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Counters of the background stock refresher.
    #[must_use]
    pub fn refresh_metrics(&self) -> &RefreshMetrics {
        &self.inner.refresh_metrics
    }
}
