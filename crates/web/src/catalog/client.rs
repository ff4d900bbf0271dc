//! Cache-aside client for the catalog API.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use customer_web_core::{Category, CategoryId, Product, ProductFilter, ProductId};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use super::cache::{CacheKey, CacheStore, CacheValue, MokaCacheStore};
use super::last_update::LastUpdate;
use super::CatalogError;
use crate::config::CatalogConfig;
use crate::resilience::{CircuitState, ResiliencePolicy, ResilienceSnapshot, UpstreamPolicy};
use crate::upstream::{HttpTransport, ReqwestTransport, TransportError, UpstreamRequest, UpstreamResponse};

const PRODUCTS_PATH: &str = "api/Product";
const CATEGORIES_PATH: &str = "api/Category";
const SYNC_PATH: &str = "api/Debug/sync-all-products";

/// Characters of an upstream body kept in logs and errors.
const BODY_EXCERPT_CHARS: usize = 500;

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the catalog API.
///
/// Cheap to clone; clones share the cache, the resilience policy and the
/// last-update timestamp. Unfiltered products and single products are cached
/// for 5 minutes, categories for an hour.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheStore>,
    policy: Arc<dyn UpstreamPolicy>,
    last_update: Arc<LastUpdate>,
    product_ttl: Duration,
    category_ttl: Duration,
    refresher_claimed: AtomicBool,
}

impl CatalogClient {
    /// Create a client with the `reqwest` transport and an in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.base_url.clone())?;
        let cache = MokaCacheStore::new(config.cache_capacity);

        Ok(Self::from_parts(
            Arc::new(transport),
            Arc::new(cache),
            Arc::new(LastUpdate::new()),
            config,
        ))
    }

    /// Assemble a client from explicit collaborators, guarded by the default
    /// [`ResiliencePolicy`] built from `config.resilience`.
    ///
    /// `config.base_url` is ignored; the transport owns the base URL.
    #[must_use]
    pub fn from_parts(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheStore>,
        last_update: Arc<LastUpdate>,
        config: &CatalogConfig,
    ) -> Self {
        let policy = Arc::new(ResiliencePolicy::new("catalog_api", &config.resilience));
        Self::with_policy(transport, cache, last_update, policy, config)
    }

    /// Like [`CatalogClient::from_parts`], with a caller-supplied policy.
    /// `config.resilience` is ignored.
    #[must_use]
    pub fn with_policy(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheStore>,
        last_update: Arc<LastUpdate>,
        policy: Arc<dyn UpstreamPolicy>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogClientInner {
                transport,
                cache,
                policy,
                last_update,
                product_ttl: config.product_ttl,
                category_ttl: config.category_ttl,
                refresher_claimed: AtomicBool::new(false),
            }),
        }
    }

    /// Send one request through the resilience policy.
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, CatalogError> {
        let response = self.inner.policy.send(self.inner.transport.as_ref(), request).await?;
        Ok(response)
    }

    /// Send a request and decode a successful JSON body.
    async fn fetch_json<T: DeserializeOwned>(&self, request: &UpstreamRequest) -> Result<T, CatalogError> {
        let response = self.send(request).await?;

        if !response.status.is_success() {
            let body = response.body_excerpt(BODY_EXCERPT_CHARS);
            if response.status != reqwest::StatusCode::NOT_FOUND {
                error!(
                    status = %response.status,
                    path = %request.path,
                    body = %body,
                    "Catalog API returned non-success status"
                );
            }
            return Err(CatalogError::Status {
                status: response.status,
                body,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| {
            error!(
                error = %e,
                path = %request.path,
                body = %response.body_excerpt(BODY_EXCERPT_CHARS),
                "Failed to parse catalog API response"
            );
            CatalogError::Parse(e)
        })
    }

    /// Like `fetch_json`, but a 404 is `Ok(None)`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        request: &UpstreamRequest,
    ) -> Result<Option<T>, CatalogError> {
        match self.fetch_json(request).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let request = UpstreamRequest::get(PRODUCTS_PATH).with_query(filter.query_pairs());
        self.fetch_json(&request).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products.
    ///
    /// Filtered queries always go to the API and are never cached. The
    /// unfiltered list is served from cache when present. An empty unfiltered
    /// list asks the API to sync and is fetched once more.
    ///
    /// Never fails: upstream errors are logged and yield an empty list.
    #[instrument(skip(self))]
    pub async fn get_products(&self, filter: &ProductFilter) -> Arc<[Product]> {
        if !filter.is_empty() {
            return match self.fetch_products(filter).await {
                Ok(products) => products.into(),
                Err(e) => {
                    error!(error = %e, "Failed to fetch filtered products");
                    Arc::from(Vec::new())
                }
            };
        }

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::AllProducts) {
            debug!(count = products.len(), "Cache hit for products");
            return products;
        }

        match self.load_all_products().await {
            Ok(products) => products,
            Err(e) => {
                error!(error = %e, "Failed to fetch products");
                Arc::from(Vec::new())
            }
        }
    }

    /// Cache miss path of the unfiltered list.
    async fn load_all_products(&self) -> Result<Arc<[Product]>, CatalogError> {
        let mut products = self.fetch_products(&ProductFilter::none()).await?;

        if products.is_empty() {
            info!("Catalog API returned no products, requesting upstream sync");
            if let Err(e) = self.trigger_sync().await {
                warn!(error = %e, "Upstream sync failed, fetching products again anyway");
            }
            products = self.fetch_products(&ProductFilter::none()).await?;
        }

        let products: Arc<[Product]> = products.into();
        self.inner.cache.set(
            CacheKey::AllProducts,
            CacheValue::Products(Arc::clone(&products)),
            self.inner.product_ttl,
        );
        self.inner.last_update.record(Utc::now());
        debug!(count = products.len(), "Cached products");

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// Returns `None` if the API reports the product missing, or if the
    /// lookup fails (logged). Missing products are not cached.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product_by_id(&self, id: ProductId) -> Option<Arc<Product>> {
        let key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key) {
            debug!("Cache hit for product");
            return Some(product);
        }

        let request = UpstreamRequest::get(format!("{PRODUCTS_PATH}/{id}"));
        match self.fetch_optional::<Product>(&request).await {
            Ok(Some(product)) => {
                let product = Arc::new(product);
                self.inner.cache.set(
                    key,
                    CacheValue::Product(Arc::clone(&product)),
                    self.inner.product_ttl,
                );
                Some(product)
            }
            Ok(None) => {
                debug!("Product not found");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch product");
                None
            }
        }
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List all categories. Never fails: errors yield an empty list.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Arc<[Category]> {
        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&CacheKey::AllCategories) {
            debug!(count = categories.len(), "Cache hit for categories");
            return categories;
        }

        match self.fetch_json::<Vec<Category>>(&UpstreamRequest::get(CATEGORIES_PATH)).await {
            Ok(categories) => {
                let categories: Arc<[Category]> = categories.into();
                self.inner.cache.set(
                    CacheKey::AllCategories,
                    CacheValue::Categories(Arc::clone(&categories)),
                    self.inner.category_ttl,
                );
                categories
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch categories");
                Arc::from(Vec::new())
            }
        }
    }

    /// Get a category by id. `None` if missing or on failure.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category_by_id(&self, id: CategoryId) -> Option<Arc<Category>> {
        let key = CacheKey::Category(id);

        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&key) {
            debug!("Cache hit for category");
            return Some(category);
        }

        let request = UpstreamRequest::get(format!("{CATEGORIES_PATH}/{id}"));
        match self.fetch_optional::<Category>(&request).await {
            Ok(Some(category)) => {
                let category = Arc::new(category);
                self.inner.cache.set(
                    key,
                    CacheValue::Category(Arc::clone(&category)),
                    self.inner.category_ttl,
                );
                Some(category)
            }
            Ok(None) => {
                debug!("Category not found");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch category");
                None
            }
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Fetch the full product list, bypassing the cache for the read, and
    /// overwrite the cached list and every cached product. Products missing
    /// from the new list are evicted.
    ///
    /// Returns the number of products refreshed.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cache is left untouched.
    #[instrument(skip(self))]
    pub async fn refresh_stock(&self) -> Result<usize, CatalogError> {
        let products: Arc<[Product]> = self.fetch_products(&ProductFilter::none()).await?.into();

        // Drop products that were in the previous list but are gone upstream.
        // A product cached only through a single lookup expires on its TTL.
        if let Some(CacheValue::Products(previous)) = self.inner.cache.get(&CacheKey::AllProducts) {
            let current: HashSet<ProductId> = products.iter().map(|p| p.id).collect();
            for gone in previous.iter().filter(|p| !current.contains(&p.id)) {
                self.inner.cache.remove(&CacheKey::Product(gone.id));
            }
        }

        for product in products.iter() {
            self.inner.cache.set(
                CacheKey::Product(product.id),
                CacheValue::Product(Arc::new(product.clone())),
                self.inner.product_ttl,
            );
        }
        self.inner.cache.set(
            CacheKey::AllProducts,
            CacheValue::Products(Arc::clone(&products)),
            self.inner.product_ttl,
        );
        self.inner.last_update.record(Utc::now());

        info!(count = products.len(), "Stock data refreshed");
        Ok(products.len())
    }

    /// Ask the catalog API to resynchronize its product data, then drop the
    /// cached product list so the next read sees the result.
    ///
    /// # Errors
    ///
    /// Returns the upstream error, or `CatalogError::Status` for a non-2xx
    /// answer. The cache is left untouched on failure.
    #[instrument(skip(self))]
    pub async fn trigger_sync(&self) -> Result<(), CatalogError> {
        let request = UpstreamRequest::post(SYNC_PATH);

        let response = self.send(&request).await.inspect_err(|e| {
            error!(error = %e, "Upstream product sync failed");
        })?;

        if !response.status.is_success() {
            let body = response.body_excerpt(BODY_EXCERPT_CHARS);
            error!(status = %response.status, body = %body, "Upstream product sync rejected");
            return Err(CatalogError::Status {
                status: response.status,
                body,
            });
        }

        self.inner.cache.remove(&CacheKey::AllProducts);
        self.inner.last_update.record(Utc::now());
        info!("Upstream product sync completed");
        Ok(())
    }

    /// When stock data was last refreshed. The first call on a fresh process
    /// initialises it to now.
    #[must_use]
    pub fn get_last_update_time(&self) -> DateTime<Utc> {
        self.inner.last_update.get_or_init()
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.cache.clear();
        info!("Catalog cache cleared");
    }

    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.inner.policy.circuit_state()
    }

    #[must_use]
    pub fn resilience_metrics(&self) -> ResilienceSnapshot {
        self.inner.policy.metrics()
    }

    /// Claim the single stock refresher slot for this client.
    ///
    /// Returns `None` if a refresher already holds it. The slot is released
    /// when the claim is dropped.
    #[must_use]
    pub fn claim_refresher(&self) -> Option<RefresherClaim> {
        self.inner
            .refresher_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefresherClaim {
                inner: Arc::clone(&self.inner),
            })
    }
}

/// Exclusive right to run the stock refresher. Released on drop.
pub struct RefresherClaim {
    inner: Arc<CatalogClientInner>,
}

impl Drop for RefresherClaim {
    fn drop(&mut self) {
        self.inner.refresher_claimed.store(false, Ordering::Release);
    }
}
