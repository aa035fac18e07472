//! Dataset import pipeline: `processing -> active | failed` version lifecycle.
//!
//! Every action is a command with its own validation and error type. The
//! only way a version reaches `active` is a single `finalize` transaction.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{datasets_routes, imports_routes, ImportRequest, ImportState};
