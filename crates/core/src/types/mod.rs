//! Core types for Customer Web.
//!
//! This module provides type-safe wrappers for catalog domain concepts.

pub mod catalog;
pub mod filter;
pub mod id;
pub mod price;

pub use catalog::{Category, Product};
pub use filter::ProductFilter;
pub use id::*;
pub use price::{Price, PriceError};
