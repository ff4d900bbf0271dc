//! Product list query filters.

use serde::{Deserialize, Serialize};

use super::id::{BrandId, CategoryId};
use super::price::Price;

/// Optional filters for a product list query.
///
/// A filter with every field unset (or a blank search term) is the
/// unfiltered catalog view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search_term: Option<String>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl ProductFilter {
    /// The unfiltered view.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    #[must_use]
    pub const fn with_category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    #[must_use]
    pub const fn with_brand(mut self, id: BrandId) -> Self {
        self.brand_id = Some(id);
        self
    }

    #[must_use]
    pub const fn with_price_range(mut self, min: Option<Price>, max: Option<Price>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Search term with surrounding whitespace removed, if non-blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Returns true when no filter parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.category_id.is_none()
            && self.brand_id.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Query string pairs in the catalog API's parameter names.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(term) = self.search_term() {
            pairs.push(("category_name", term.to_string()));
        }
        if let Some(id) = self.category_id {
            pairs.push(("category_id", id.to_string()));
        }
        if let Some(id) = self.brand_id {
            pairs.push(("brand_id", id.to_string()));
        }
        if let Some(price) = self.min_price {
            pairs.push(("min_price", price.amount().to_string()));
        }
        if let Some(price) = self.max_price {
            pairs.push(("max_price", price.amount().to_string()));
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(ProductFilter::none().is_empty());
        assert!(ProductFilter::none().query_pairs().is_empty());
    }

    #[test]
    fn test_blank_search_term_counts_as_unset() {
        let filter = ProductFilter::none().with_search_term("   ");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_query_pairs_use_api_names() {
        let filter = ProductFilter::none()
            .with_search_term(" mouse ")
            .with_category(CategoryId::new(2))
            .with_brand(BrandId::new(5))
            .with_price_range(Some("10".parse().unwrap()), Some("99.50".parse().unwrap()));

        assert!(!filter.is_empty());
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("category_name", "mouse".to_string()),
                ("category_id", "2".to_string()),
                ("brand_id", "5".to_string()),
                ("min_price", "10".to_string()),
                ("max_price", "99.50".to_string()),
            ]
        );
    }
}
