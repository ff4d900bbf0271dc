//! Cache store for catalog API responses.
//!
//! The client only talks to a [`CacheStore`]; the production store is
//! [`MokaCacheStore`]. Values are `Arc`-wrapped snapshots, so a reader keeps
//! whatever it got even if a writer replaces the entry a moment later.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use customer_web_core::{Category, CategoryId, Product, ProductId};
use moka::Expiry;
use moka::sync::Cache;

/// Cache key for products and categories.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The unfiltered product list
    AllProducts,
    Product(ProductId),
    AllCategories,
    Category(CategoryId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllProducts => f.write_str("all_products"),
            Self::Product(id) => write!(f, "product_{id}"),
            Self::AllCategories => f.write_str("all_categories"),
            Self::Category(id) => write!(f, "category_{id}"),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<[Product]>),
    Product(Arc<Product>),
    Categories(Arc<[Category]>),
    Category(Arc<Category>),
}

/// Get/set/remove with a per-entry absolute TTL.
///
/// Implementations must replace entries atomically per key: a concurrent
/// reader sees either the old or the new value.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheValue>;

    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration);

    fn remove(&self, key: &CacheKey);

    fn clear(&self);
}

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    ttl: Duration,
}

/// Expires each entry `ttl` after it was last written.
struct PerEntryTtl;

impl Expiry<CacheKey, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &CacheKey, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory store backed by `moka`.
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<CacheKey, Entry>,
}

impl MokaCacheStore {
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl CacheStore for MokaCacheStore {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.cache.get(key).map(|entry| entry.value)
    }

    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        self.cache.insert(key, Entry { value, ttl });
    }

    fn remove(&self, key: &CacheKey) {
        self.cache.invalidate(key);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i32) -> CacheValue {
        CacheValue::Category(Arc::new(Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
        }))
    }

    #[test]
    fn test_key_format() {
        assert_eq!(CacheKey::AllProducts.to_string(), "all_products");
        assert_eq!(CacheKey::Product(ProductId::new(1)).to_string(), "product_1");
        assert_eq!(CacheKey::AllCategories.to_string(), "all_categories");
        assert_eq!(CacheKey::Category(CategoryId::new(9)).to_string(), "category_9");
    }

    #[test]
    fn test_set_get_remove() {
        let store = MokaCacheStore::new(100);
        let key = CacheKey::Category(CategoryId::new(1));

        assert!(store.get(&key).is_none());
        store.set(key, category(1), Duration::from_secs(60));
        assert!(matches!(store.get(&key), Some(CacheValue::Category(c)) if c.name == "Category 1"));

        store.remove(&key);
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let store = MokaCacheStore::new(100);
        let key = CacheKey::Category(CategoryId::new(1));

        store.set(key, category(1), Duration::from_secs(60));
        let Some(CacheValue::Category(first)) = store.get(&key) else {
            panic!("expected cached category");
        };

        store.set(key, category(2), Duration::from_secs(60));
        let Some(CacheValue::Category(second)) = store.get(&key) else {
            panic!("expected cached category");
        };

        // The earlier reader still holds its own snapshot
        assert_eq!(first.name, "Category 1");
        assert_eq!(second.name, "Category 2");
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let store = MokaCacheStore::new(100);
        let key = CacheKey::AllCategories;

        store.set(key, CacheValue::Categories(Arc::from(Vec::new())), Duration::from_millis(50));
        assert!(store.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(120));
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = MokaCacheStore::new(100);
        store.set(CacheKey::Category(CategoryId::new(1)), category(1), Duration::from_secs(60));
        store.set(CacheKey::Category(CategoryId::new(2)), category(2), Duration::from_secs(60));

        store.clear();

        assert!(store.get(&CacheKey::Category(CategoryId::new(1))).is_none());
        assert!(store.get(&CacheKey::Category(CategoryId::new(2))).is_none());
    }
}
