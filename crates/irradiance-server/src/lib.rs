//! Irradiance Server Library
//!
//! HTTP service answering "what is the monthly solar irradiance at this
//! coordinate?" and managing the reference datasets behind the answer.
//!
//! # Overview
//!
//! - **Resolution**: three ranked tiers (regional grid service, global
//!   climatology service, local reference grid) tried in order, with a
//!   coordinate cache in front of each
//! - **Imports**: dataset versions go `processing -> active | failed`; only
//!   the `finalize` transaction activates a version
//! - **Database**: PostgreSQL through SQLx
//! - **Middleware**: CORS, request tracing and a caller gate
//!
//! # Example
//!
//! ```no_run
//! use irradiance_server::{api, config::Config};
//!
//! # async fn run(state: api::AppState) -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let app = api::create_router(state, &config);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
