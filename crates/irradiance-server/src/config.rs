//! Configuration management

use irradiance_common::geo::BoundingBox;
use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/irradiance";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Resolver Constants
// ============================================================================

/// Upper bound on a single tier call, timeouts count as a tier failure.
pub const DEFAULT_TIER_TIMEOUT_SECS: u64 = 25;

pub const DEFAULT_TIER1_BASE_URL: &str =
    "https://developer.nrel.gov/api/nsrdb/v2/solar/psm3-2-2-download.csv";

/// Reference year requested from the high-resolution provider.
pub const DEFAULT_TIER1_YEAR: u16 = 2020;

pub const DEFAULT_TIER1_INTERVAL_MINUTES: u32 = 60;

/// GOES footprint over the Americas: `min_lat,min_lon,max_lat,max_lon`.
pub const DEFAULT_TIER1_BBOX: &str = "-60,-180,61,-20";

/// Fewer data rows than this is treated as an empty answer.
pub const DEFAULT_TIER1_MIN_ROWS: usize = 24;

pub const DEFAULT_TIER2_BASE_URL: &str =
    "https://power.larc.nasa.gov/api/temporal/climatology/point";

pub const DEFAULT_TIER3_DATASET: &str = "reference";

/// Largest accepted `batch` import action.
pub const DEFAULT_IMPORT_MAX_BATCH_ROWS: usize = 20_000;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub resolver: ResolverConfig,
    pub import: ImportConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Caller gate for `/api/v1`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub required: bool,
}

/// Tier resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub tier_timeout_secs: u64,
    pub tier1: Tier1Config,
    pub tier2: Tier2Config,
    pub tier3: Tier3Config,
}

/// High-resolution regional grid service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier1Config {
    pub base_url: String,
    /// Without a key the tier reports every coordinate as out of coverage.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub year: u16,
    pub interval_minutes: u32,
    pub bbox: BoundingBox,
    pub min_rows: usize,
}

/// Global climatology service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier2Config {
    pub base_url: String,
}

/// Local reference grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier3Config {
    pub default_dataset: String,
}

/// Import pipeline limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportConfig {
    pub max_batch_rows: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bbox = std::env::var("TIER1_BBOX")
            .unwrap_or_else(|_| DEFAULT_TIER1_BBOX.to_string())
            .parse::<BoundingBox>()
            .map_err(|e| anyhow::anyhow!("Invalid TIER1_BBOX: {}", e))?;

        let config = Config {
            server: ServerConfig {
                host: std::env::var("IRRADIANCE_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("IRRADIANCE_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "IRRADIANCE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            auth: AuthConfig {
                required: env_or("AUTH_REQUIRED", true),
            },
            resolver: ResolverConfig {
                tier_timeout_secs: env_or("TIER_TIMEOUT_SECS", DEFAULT_TIER_TIMEOUT_SECS),
                tier1: Tier1Config {
                    base_url: std::env::var("TIER1_BASE_URL")
                        .unwrap_or_else(|_| DEFAULT_TIER1_BASE_URL.to_string()),
                    api_key: env_opt("TIER1_API_KEY"),
                    email: env_opt("TIER1_EMAIL"),
                    year: env_or("TIER1_YEAR", DEFAULT_TIER1_YEAR),
                    interval_minutes: env_or(
                        "TIER1_INTERVAL_MINUTES",
                        DEFAULT_TIER1_INTERVAL_MINUTES,
                    ),
                    bbox,
                    min_rows: env_or("TIER1_MIN_ROWS", DEFAULT_TIER1_MIN_ROWS),
                },
                tier2: Tier2Config {
                    base_url: std::env::var("TIER2_BASE_URL")
                        .unwrap_or_else(|_| DEFAULT_TIER2_BASE_URL.to_string()),
                },
                tier3: Tier3Config {
                    default_dataset: std::env::var("TIER3_DEFAULT_DATASET")
                        .unwrap_or_else(|_| DEFAULT_TIER3_DATASET.to_string()),
                },
            },
            import: ImportConfig {
                max_batch_rows: env_or("IMPORT_MAX_BATCH_ROWS", DEFAULT_IMPORT_MAX_BATCH_ROWS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.resolver.tier_timeout_secs == 0 {
            anyhow::bail!("TIER_TIMEOUT_SECS must be greater than 0");
        }

        // Interval must divide an hour so daily sums line up with the provider's grid.
        let interval = self.resolver.tier1.interval_minutes;
        if interval == 0 || 60 % interval != 0 {
            anyhow::bail!("TIER1_INTERVAL_MINUTES must divide 60, got {}", interval);
        }

        if self.resolver.tier3.default_dataset.trim().is_empty() {
            anyhow::bail!("TIER3_DEFAULT_DATASET cannot be empty");
        }

        if self.import.max_batch_rows == 0 {
            anyhow::bail!("IMPORT_MAX_BATCH_ROWS must be greater than 0");
        }

        if self.resolver.tier1.api_key.is_none() {
            tracing::warn!("TIER1_API_KEY not set - tier1 will report every coordinate as out of coverage");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        if !self.auth.required {
            tracing::warn!("AUTH_REQUIRED=false - caller gate disabled");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            auth: AuthConfig { required: true },
            resolver: ResolverConfig {
                tier_timeout_secs: DEFAULT_TIER_TIMEOUT_SECS,
                tier1: Tier1Config {
                    base_url: DEFAULT_TIER1_BASE_URL.to_string(),
                    api_key: None,
                    email: None,
                    year: DEFAULT_TIER1_YEAR,
                    interval_minutes: DEFAULT_TIER1_INTERVAL_MINUTES,
                    bbox: BoundingBox {
                        min_lat: -60.0,
                        min_lon: -180.0,
                        max_lat: 61.0,
                        max_lon: -20.0,
                    },
                    min_rows: DEFAULT_TIER1_MIN_ROWS,
                },
                tier2: Tier2Config {
                    base_url: DEFAULT_TIER2_BASE_URL.to_string(),
                },
                tier3: Tier3Config {
                    default_dataset: DEFAULT_TIER3_DATASET.to_string(),
                },
            },
            import: ImportConfig {
                max_batch_rows: DEFAULT_IMPORT_MAX_BATCH_ROWS,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.resolver.tier1.bbox,
            DEFAULT_TIER1_BBOX.parse::<BoundingBox>().unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_bad_interval() {
        let mut config = Config::default();
        config.resolver.tier1.interval_minutes = 7;
        assert!(config.validate().is_err());

        config.resolver.tier1.interval_minutes = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_pool_inversion() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.resolver.tier1.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
