use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::catalog::CatalogClient;

/// Ask the catalog API to sync once, in the background.
///
/// Best-effort: nobody awaits the handle during startup and a failure is only
/// logged.
pub fn spawn_startup_sync(catalog: CatalogClient) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Requesting startup catalog sync");
        match catalog.trigger_sync().await {
            Ok(()) => info!("Startup catalog sync finished"),
            Err(e) => warn!(error = %e, "Startup catalog sync failed, continuing without it"),
        }
    })
}
