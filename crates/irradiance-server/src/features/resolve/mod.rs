//! Coordinate-to-irradiance resolution over three ranked tiers.

pub mod cache;
pub mod orchestrator;
pub mod routes;
pub mod tier;
pub mod tier1;
pub mod tier2;
pub mod tier3;

pub use cache::{CoordinateCache, PgCoordinateCache};
pub use orchestrator::{AppOrchestrator, Orchestrator, Resolution, ResolveError, Resolver};
pub use routes::resolve_routes;
pub use tier::{FailureKind, ResolveRequest, TierFailure, TierResolver, TierSeries};
pub use tier1::Tier1Client;
pub use tier2::Tier2Client;
pub use tier3::Tier3Grid;
