//! Irradiance CLI Library
//!
//! Operator tool for the irradiance server.
//!
//! - **Imports**: stream a reference CSV into a new dataset version (`irradiance import`)
//! - **Lookups**: diagnostic resolution through all tiers or one (`irradiance resolve`)
//! - **Maintenance**: remove versions and reclaim abandoned imports
//! - **Listing**: datasets with their active version (`irradiance datasets`)

pub mod api;
pub mod commands;
pub mod error;
pub mod progress;
pub mod reference;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use irradiance_common::Tier;
use std::path::PathBuf;
use uuid::Uuid;

/// Irradiance - solar resource lookups and reference dataset imports
#[derive(Parser, Debug)]
#[command(name = "irradiance")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(
        long,
        env = "IRRADIANCE_SERVER_URL",
        default_value = api::client::DEFAULT_SERVER_URL,
        global = true
    )]
    pub server_url: String,

    /// Caller identity sent as `x-user-id`
    #[arg(long, env = "IRRADIANCE_USER", global = true)]
    pub user: Option<String>,

    /// Print the command reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a reference CSV (`lat,lon,month,ghi,dhi`) as a new dataset version
    Import {
        /// Path to the CSV file
        file: PathBuf,

        /// Dataset code, e.g. `reference`
        #[arg(short, long)]
        dataset: String,

        /// Version tag, e.g. `2024.1`
        #[arg(short, long)]
        tag: String,

        /// Free-form provenance note stored with the version
        #[arg(short, long)]
        note: Option<String>,

        /// Rows per batch request
        #[arg(short, long, default_value_t = commands::import::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Refuse to import unless the file's SHA-256 matches
        #[arg(long)]
        expect_checksum: Option<String>,
    },

    /// Resolve monthly GHI/DHI for a coordinate
    Resolve {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Ask one tier only (tier1, tier2, tier3)
        #[arg(long)]
        tier: Option<Tier>,

        /// Dataset for the reference grid tier
        #[arg(long)]
        dataset: Option<String>,

        /// Dataset version the caller works against
        #[arg(long)]
        version_id: Option<Uuid>,
    },

    /// Permanently delete one dataset version
    DeleteVersion {
        #[arg(short, long)]
        dataset: String,

        #[arg(short, long)]
        tag: String,
    },

    /// Delete failed and abandoned imports
    Reclaim {
        /// Limit to one dataset
        #[arg(short, long)]
        dataset: Option<String>,

        /// Processing versions idle this long count as abandoned
        #[arg(long)]
        stale_after_hours: Option<i64>,
    },

    /// List datasets and their active versions
    Datasets,
}
