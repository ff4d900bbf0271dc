//! Catalog snapshots as returned by the upstream catalog API.
//!
//! The API speaks camelCase JSON. Snapshots are immutable: nothing in this
//! workspace edits a product after it is deserialized.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{BrandId, CategoryId, ProductId};
use super::price::Price;

/// A product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// European article number used by the supplier feeds.
    #[serde(default)]
    pub ean: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub category_name: Option<String>,
    pub brand_id: BrandId,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub in_stock: bool,
    /// When a product that is out of stock is expected back.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub expected_restock: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product can be ordered right now.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.in_stock
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
}

/// Accepts RFC 3339 timestamps as well as offset-less ones, which the
/// upstream emits for server-local dates. Offset-less values are read as UTC.
fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}
