//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod datasets;
pub mod import;
pub mod resolve;
pub mod versions;
