//! Build automation tasks for the irradiance workspace
//!
//! - Generating the operator CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the irradiance workspace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<irradiance_cli::Cli>();

    let content = format!(
        r#"# Irradiance CLI Reference

Generated from the CLI source code. Last updated: {}.

## Overview

`irradiance` is the operator tool for the irradiance server. It imports
reference grids as new dataset versions, runs diagnostic lookups through
the resolver tiers and cleans up versions.

## Installation

```bash
cargo install --path crates/irradiance-cli
```

## Quick Start

```bash
# Import a reference grid (header: lat,lon,month,ghi,dhi)
irradiance import grid.csv --dataset reference --tag 2024.1

# Resolve a coordinate through all tiers
irradiance resolve -15.05 -47.02

# Ask the reference grid only
irradiance resolve -15.05 -47.02 --tier tier3

# List datasets and their active versions
irradiance datasets

# Remove failed or abandoned imports
irradiance reclaim --stale-after-hours 24
```

## Commands

{}

## Environment Variables

- `IRRADIANCE_SERVER_URL` - Server URL (default: `http://localhost:8000`)
- `IRRADIANCE_USER` - Caller identity sent as `x-user-id`
- `IRRADIANCE_API_TIMEOUT_SECS` - Per-request timeout (default: 120)
- `LOG_LEVEL` - Logging level (`trace`, `debug`, `info`, `warn`, `error`)

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
