//! Irradiance Server - Main entry point

use anyhow::Result;
use irradiance_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use irradiance_server::{
    api::{self, AppState},
    config::Config,
    db::{self, DbConfig},
    features::resolve::{Orchestrator, PgCoordinateCache, Tier1Client, Tier2Client, Tier3Grid},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("irradiance-server")
        .filter_directives("irradiance_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Irradiance Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&DbConfig::from(&config.database)).await?;
    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    let tier_timeout = Duration::from_secs(config.resolver.tier_timeout_secs);
    // The orchestrator enforces the per-tier deadline; the client gets a
    // slightly longer one so a hung socket is still torn down.
    let http = reqwest::Client::builder()
        .user_agent(concat!("irradiance-server/", env!("CARGO_PKG_VERSION")))
        .timeout(tier_timeout + Duration::from_secs(1))
        .build()?;

    let orchestrator = Orchestrator::new(
        Tier1Client::new(http.clone(), config.resolver.tier1.clone()),
        Tier2Client::new(http, config.resolver.tier2.clone()),
        Tier3Grid::new(db_pool.clone(), config.resolver.tier3.clone()),
        PgCoordinateCache::new(db_pool.clone()),
        tier_timeout,
    );
    info!(timeout_secs = config.resolver.tier_timeout_secs, "Tier orchestrator ready");

    let state = AppState {
        db: db_pool,
        orchestrator: Arc::new(orchestrator),
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
