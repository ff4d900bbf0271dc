//! Customer Web catalog layer.
//!
//! This crate fronts the catalog API with a cache-aside client, retry and
//! circuit breaker policies, and a background stock refresher. The binary
//! wires these together and exposes operational endpoints.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod jobs;
pub mod resilience;
pub mod routes;
pub mod state;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;
