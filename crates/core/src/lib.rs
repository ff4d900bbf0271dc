//! Customer Web Core - Shared catalog types.
//!
//! This crate provides the immutable catalog snapshots returned by the
//! upstream catalog API:
//! - `web` - Catalog data-access layer and operational endpoints
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no caching, no HTTP clients.
//! Everything here deserializes straight from the catalog API's JSON bodies.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, categories and query filters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
