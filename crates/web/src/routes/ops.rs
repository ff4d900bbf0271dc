//! Operator actions on the catalog cache.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;

/// Ask the catalog API to resynchronize and drop the cached product list.
#[instrument(skip(state))]
pub async fn sync(State(state): State<AppState>) -> Result<StatusCode> {
    add_breadcrumb("ops", "Manual catalog sync requested");
    state.catalog().trigger_sync().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub products: usize,
    pub last_update: DateTime<Utc>,
}

/// Run one stock refresh outside the background schedule.
#[instrument(skip(state))]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    add_breadcrumb("ops", "Manual stock refresh requested");
    let products = state.catalog().refresh_stock().await?;

    Ok(Json(RefreshResponse {
        products,
        last_update: state.catalog().get_last_update_time(),
    }))
}

/// Drop every cached catalog entry.
#[instrument(skip(state))]
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    add_breadcrumb("ops", "Catalog cache cleared");
    state.catalog().invalidate_all();
    StatusCode::NO_CONTENT
}
