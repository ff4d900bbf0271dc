//! Health check handlers.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::RefreshSnapshot;
use crate::resilience::{CircuitState, ResilienceSnapshot};
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the catalog API.
pub async fn health() -> &'static str {
    "ok"
}

/// Catalog status report.
#[derive(Debug, Serialize)]
pub struct CatalogHealth {
    pub environment: String,
    /// When stock data was last refreshed
    pub last_update: DateTime<Utc>,
    pub circuit_state: CircuitState,
    pub resilience: ResilienceSnapshot,
    pub refresh: RefreshSnapshot,
}

/// Catalog health endpoint. Always 200; an open circuit is reported, not
/// treated as a failure of this process.
pub async fn catalog_status(State(state): State<AppState>) -> Json<CatalogHealth> {
    let catalog = state.catalog();

    Json(CatalogHealth {
        environment: state.config().environment.to_string(),
        last_update: catalog.get_last_update_time(),
        circuit_state: catalog.circuit_state(),
        resilience: catalog.resilience_metrics(),
        refresh: state.refresh_metrics().snapshot(),
    })
}
