//! `reqwest`-backed transport.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{HttpTransport, TransportError, UpstreamRequest, UpstreamResponse};

/// Sends catalog API requests with a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport rooted at `base_url`.
    ///
    /// The base URL should end in `/` so relative paths join beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("customer-web/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn url_for(&self, request: &UpstreamRequest) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|source| TransportError::InvalidUrl {
                path: request.path.clone(),
                source,
            })?;

        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let url = self.url_for(request)?;
        debug!(method = %request.method, url = %url, "Sending catalog API request");

        let response = self
            .client
            .request(request.method.clone(), url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn test_url_joins_relative_path() {
        let url = transport("http://localhost:5252/")
            .url_for(&UpstreamRequest::get("api/Product/7"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5252/api/Product/7");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let url = transport("https://catalog.example.net/v1/")
            .url_for(&UpstreamRequest::get("api/Category"))
            .unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.net/v1/api/Category");
    }

    #[test]
    fn test_url_encodes_query() {
        let request = UpstreamRequest::get("api/Product").with_query(vec![
            ("category_name", "usb cables".to_string()),
            ("min_price", "9.99".to_string()),
        ]);
        let url = transport("http://localhost:5252/").url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5252/api/Product?category_name=usb+cables&min_price=9.99"
        );
    }
}
