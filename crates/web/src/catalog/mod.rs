//! Catalog API client.
//!
//! # Architecture
//!
//! - Cache-aside: reads check the [`CacheStore`] first and fill it on miss
//! - Every upstream call runs through one shared
//!   [`ResiliencePolicy`](crate::resilience::ResiliencePolicy)
//! - Filtered product queries are never cached
//! - List reads fail open (empty), single reads fail to `None`, maintenance
//!   operations (`refresh_stock`, `trigger_sync`) return their errors
//!
//! # Example
//!
//! ```rust,ignore
//! use customer_web::catalog::CatalogClient;
//!
//! let catalog = CatalogClient::new(&config.catalog)?;
//!
//! let products = catalog.get_products(&ProductFilter::none()).await;
//! let product = catalog.get_product_by_id(ProductId::new(1)).await;
//! ```

pub mod cache;
mod client;
pub mod last_update;

pub use cache::{CacheKey, CacheStore, CacheValue, MokaCacheStore};
pub use client::{CatalogClient, RefresherClaim};
pub use last_update::LastUpdate;

use reqwest::StatusCode;
use thiserror::Error;

use crate::resilience::PolicyError;

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Retries exhausted at the network level, or the circuit is open.
    #[error(transparent)]
    Upstream(#[from] PolicyError),

    /// The API answered with a non-success status.
    #[error("Catalog API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether the API reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Whether the call was refused by an open circuit.
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::Upstream(PolicyError::CircuitOpen { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::TransportError;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "Catalog API returned 502 Bad Gateway: upstream down");

        let err = CatalogError::from(PolicyError::CircuitOpen {
            component: "catalog_api".to_string(),
        });
        assert_eq!(err.to_string(), "Circuit breaker is open for catalog_api");
        assert!(err.is_circuit_open());
    }

    #[test]
    fn test_not_found_classification() {
        let not_found = CatalogError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(not_found.is_not_found());

        let transport = CatalogError::from(PolicyError::from(TransportError::Timeout));
        assert!(!transport.is_not_found());
        assert!(!transport.is_circuit_open());
    }
}
