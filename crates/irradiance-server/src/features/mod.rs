//! Feature slices of the irradiance API
//!
//! - **resolve**: tiered GHI/DHI lookups for a coordinate
//! - **imports**: dataset version import pipeline and dataset listings
//!
//! Each slice keeps its write operations in `commands/`, reads in `queries/`
//! and HTTP wiring in `routes.rs`.

pub mod imports;
pub mod resolve;

use axum::Router;
use std::sync::Arc;

use crate::config::{AuthConfig, ImportConfig};
use crate::middleware::require_caller;
use imports::ImportState;
use resolve::AppOrchestrator;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    pub orchestrator: Arc<AppOrchestrator>,
    pub import: ImportConfig,
    pub auth: AuthConfig,
}

/// Mount every feature under its path prefix
///
/// - `/irradiance` - tiered resolution
/// - `/imports` - import actions
/// - `/datasets` - dataset and version listings
///
/// All of them sit behind the caller gate.
pub fn router(state: FeatureState) -> Router<()> {
    let import_state = ImportState {
        db: state.db.clone(),
        config: state.import,
    };

    Router::new()
        .nest("/irradiance", resolve::resolve_routes().with_state(state.orchestrator.clone()))
        .nest("/imports", imports::imports_routes().with_state(import_state))
        .nest("/datasets", imports::datasets_routes().with_state(state.db.clone()))
        .layer(axum::middleware::from_fn_with_state(state.auth, require_caller))
}
