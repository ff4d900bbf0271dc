//! Unified error handling with Sentry integration.
//!
//! Provides an `AppError` type that captures server-side errors to Sentry
//! before responding. Operational route handlers return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;

/// Application-level error type for the operational endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog API operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        let status = match &self {
            Self::Catalog(err) if err.is_circuit_open() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose upstream bodies or internals to clients
        let message = match &self {
            Self::Catalog(err) if err.is_circuit_open() => "Catalog API temporarily unavailable",
            Self::Catalog(_) => "External service error",
            Self::Internal(_) => "Internal server error",
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for operator actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode as UpstreamStatus;

    use super::*;
    use crate::resilience::PolicyError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Internal("scheduler task panicked".to_string());
        assert_eq!(err.to_string(), "Internal error: scheduler task panicked");
    }

    #[test]
    fn test_app_error_status_codes() {
        let upstream = CatalogError::Status {
            status: UpstreamStatus::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(get_status(AppError::from(upstream)), StatusCode::BAD_GATEWAY);

        let open = CatalogError::from(PolicyError::CircuitOpen {
            component: "catalog_api".to_string(),
        });
        assert_eq!(get_status(AppError::from(open)), StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
