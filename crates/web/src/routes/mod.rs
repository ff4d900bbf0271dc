//! HTTP route handlers for the operational endpoints.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/catalog         - Catalog cache, breaker and refresher status
//!
//! # Operator actions
//! POST /ops/sync               - Ask the catalog API to resync, drop product list
//! POST /ops/refresh            - Run one stock refresh now
//! POST /ops/cache/clear        - Drop every cached catalog entry
//! ```

pub mod health;
pub mod ops;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/catalog", get(health::catalog_status))
        .route("/ops/sync", post(ops::sync))
        .route("/ops/refresh", post(ops::refresh))
        .route("/ops/cache/clear", post(ops::clear_cache))
}
