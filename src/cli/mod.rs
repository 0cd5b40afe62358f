//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for sinan-ingest using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// sinan-ingest - SINAN notification ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "sinan-ingest")]
#[command(version, about, long_about = None)]
#[command(author = "sinan-ingest Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sinan-ingest.toml", env = "SINAN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SINAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest notification files into the destination table
    Ingest(commands::ingest::IngestArgs),

    /// Show the status, log and id indexes of a job
    Status(commands::status::StatusArgs),

    /// Mark jobs left running by a crashed worker as failed
    Recover(commands::recover::RecoverArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Disease;

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::parse_from([
            "sinan-ingest",
            "ingest",
            "DENGBR24.dbf",
            "--disease",
            "dengue",
            "--year",
            "2024",
        ]);
        assert_eq!(cli.config, "sinan-ingest.toml");
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.disease, Disease::Dengue);
                assert_eq!(args.files.len(), 1);
                assert!(args.uf.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["sinan-ingest", "--config", "custom.toml", "recover"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Recover(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["sinan-ingest", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["sinan-ingest", "status", "--logs", "warning", "--only"]);
        match cli.command {
            Commands::Status(args) => {
                assert!(args.job_id.is_none());
                assert!(args.only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["sinan-ingest", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_rejects_unknown_disease() {
        let result = Cli::try_parse_from([
            "sinan-ingest",
            "ingest",
            "a.csv",
            "--disease",
            "malaria",
            "--year",
            "2024",
        ]);
        assert!(result.is_err());
    }
}
