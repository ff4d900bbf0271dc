//! In-memory fakes shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::time::Instant;
use url::Url;

use crate::catalog::{CacheKey, CacheStore, CacheValue, CatalogClient, LastUpdate};
use crate::config::{AppConfig, CatalogConfig, Environment, StockRefreshConfig};
use crate::upstream::{HttpTransport, TransportError, UpstreamRequest, UpstreamResponse};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusCode, String),
    ConnectError,
}

impl Reply {
    pub fn json(body: &Value) -> Self {
        Self::Status(StatusCode::OK, body.to_string())
    }

    pub fn status(status: StatusCode) -> Self {
        Self::Status(status, String::new())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub at: Instant,
}

/// Replies per `(method, path)` in order. The last reply repeats; unscripted
/// routes answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .extend(replies);
    }

    /// Replace the script for a route.
    pub fn reset(&self, method: Method, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.routes
            .lock()
            .insert((method, path.to_string()), replies.into_iter().collect());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            at: Instant::now(),
        });

        let reply = {
            let mut routes = self.routes.lock();
            match routes.get_mut(&(request.method.clone(), request.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Status(status, body)) => Ok(UpstreamResponse::new(status, body)),
            Some(Reply::ConnectError) => Err(TransportError::Connect("connection refused".to_string())),
            None => Ok(UpstreamResponse::new(StatusCode::NOT_FOUND, "no route")),
        }
    }
}

/// `CacheStore` on the tokio clock, so paused-time tests can expire entries.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, (CacheValue, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        self.entries.lock().insert(key, (value, Instant::now() + ttl));
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.lock().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

pub fn product_json(id: i32, in_stock: bool) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "description": "A product",
        "ean": format!("50000000000{id:02}"),
        "categoryId": 1,
        "categoryName": "Cables",
        "brandId": 2,
        "brandName": "Acme",
        "price": 9.99,
        "inStock": in_stock,
        "expectedRestock": null
    })
}

pub fn products_json(ids: &[i32]) -> Value {
    Value::Array(ids.iter().map(|id| product_json(*id, true)).collect())
}

pub fn category_json(id: i32) -> Value {
    json!({ "id": id, "name": format!("Category {id}") })
}

pub fn catalog_config() -> CatalogConfig {
    CatalogConfig::new(Url::parse("http://catalog.test/").unwrap())
}

/// A catalog client over `transport` with a fresh in-memory store.
pub fn catalog(transport: &Arc<ScriptedTransport>) -> CatalogClient {
    CatalogClient::from_parts(
        Arc::clone(transport) as Arc<dyn HttpTransport>,
        MemoryStore::new() as Arc<dyn CacheStore>,
        Arc::new(LastUpdate::new()),
        &catalog_config(),
    )
}

pub fn app_config() -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        catalog: catalog_config(),
        refresh: StockRefreshConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}
