// sinan-ingest - SINAN Notification Ingestion Pipeline
// Copyright (c) 2025 sinan-ingest Contributors
// Licensed under the MIT License

use clap::Parser;
use sinan_ingest::cli::{Cli, Commands};
use sinan_ingest::config::{load_config, LoggingConfig};
use sinan_ingest::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // A missing .env is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging only for `ingest`, and only when the config asks for it
    let logging_config = match &cli.command {
        Commands::Ingest(_) => load_config(&cli.config)
            .map(|c| c.logging)
            .unwrap_or_else(|_| console_only()),
        _ => console_only(),
    };
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let _guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "sinan-ingest - SINAN notification ingestion"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(_guard);
    process::exit(exit_code);
}

fn console_only() -> LoggingConfig {
    LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Ingest(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Recover(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
