//! Irradiance CLI - Main entry point

use clap::Parser;
use irradiance_cli::{api::ApiClient, commands, Cli, Commands};
use irradiance_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Verbose mode logs debug to the console; otherwise only warnings
    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("irradiance-cli")
        .build();

    // LOG_LEVEL replaces the flag-derived config; stdout stays clean for JSON otherwise
    let log_config = match std::env::var_os("LOG_LEVEL") {
        Some(_) => LogConfig::from_env().unwrap_or(log_config),
        None => log_config,
    };

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli) -> irradiance_cli::Result<()> {
    let Some(ref command) = cli.command else {
        return Ok(());
    };

    let client = ApiClient::new(cli.server_url.clone(), cli.user.clone())?;

    match command {
        Commands::Import {
            file,
            dataset,
            tag,
            note,
            batch_size,
            expect_checksum,
        } => {
            let args = commands::import::ImportArgs {
                file: file.clone(),
                dataset: dataset.clone(),
                tag: tag.clone(),
                note: note.clone(),
                batch_size: *batch_size,
                expect_checksum: expect_checksum.clone(),
            };
            commands::import::run(&client, args).await.map(|_| ())
        },

        Commands::Resolve {
            lat,
            lon,
            tier,
            dataset,
            version_id,
        } => {
            commands::resolve::run(&client, *lat, *lon, *tier, dataset.as_deref(), *version_id).await
        },

        Commands::DeleteVersion { dataset, tag } => {
            commands::versions::delete(&client, dataset, tag).await
        },

        Commands::Reclaim {
            dataset,
            stale_after_hours,
        } => commands::versions::reclaim(&client, dataset.as_deref(), *stale_after_hours)
            .await
            .map(|_| ()),

        Commands::Datasets => commands::datasets::run(&client).await,
    }
}
