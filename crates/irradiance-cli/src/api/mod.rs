//! API client module
//!
//! HTTP client for the irradiance server's resolution and import endpoints.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::ApiClient;
pub use types::*;
