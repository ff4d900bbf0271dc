//! Outbound HTTP plumbing for the catalog API.
//!
//! Requests are described by [`UpstreamRequest`] (method, relative path,
//! query) and sent through an [`HttpTransport`]. The
//! production transport is [`ReqwestTransport`]; tests substitute a scripted
//! in-memory one.
//!
//! A transport never interprets status codes. A 404 or 500 comes back as an
//! `Ok(UpstreamResponse)`; only network-level failures are `Err`. Deciding
//! what is transient is the resilience layer's job.

mod client;

pub use client::ReqwestTransport;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Network-level failures. Anything that produced an HTTP status is not one
/// of these.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not connect to the upstream host.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Any other request failure (body read, protocol, TLS...).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The relative path could not be joined onto the base URL.
    #[error("invalid request path {path}: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

impl TransportError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Http(error)
        }
    }
}

/// One outbound call to the catalog API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `api/Product/1`.
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl UpstreamRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }
}

/// A fully-read upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: String,
}

impl UpstreamResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body truncated for log output.
    #[must_use]
    pub fn body_excerpt(&self, max_chars: usize) -> String {
        self.body.chars().take(max_chars).collect()
    }
}

/// Sends a single request. Implementations must not retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}
