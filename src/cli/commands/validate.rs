//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the sinan-ingest configuration file.

use clap::Args;

use crate::config::{load_config, redact_connection_string};

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(_) => {
                use secrecy::ExposeSecret;

                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Dry Run: {}", config.application.dry_run);
                match &config.postgresql {
                    Some(pg) => {
                        println!(
                            "  PostgreSQL Connection: {}",
                            redact_connection_string(pg.connection_string.expose_secret().as_str())
                        );
                        println!("  Max Connections: {}", pg.max_connections);
                    }
                    None => println!("  PostgreSQL: not configured (in-memory destination)"),
                }
                println!(
                    "  Destination: {}.{} (constraint {})",
                    config.destination.schema,
                    config.destination.table,
                    config.destination.unique_constraint
                );
                println!("  Chunk Size: {}", config.ingest.chunk_size);
                println!("  Rows per Statement: {}", config.ingest.rows_per_statement);
                println!("  Parallel Jobs: {}", config.ingest.max_parallel_jobs);
                println!("  Ledger Directory: {}", config.ingest.ledger_dir.display());
                if let Some(archive) = &config.ingest.archive_dir {
                    println!("  Archive Directory: {}", archive.display());
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}
