//! Recover command implementation
//!
//! Seals jobs a crashed worker left `running`. Run it only while no worker
//! is using the ledger directory.

use clap::Args;

use crate::config::load_config;
use crate::core::ledger::recover_interrupted;

/// Arguments for the recover command
#[derive(Args, Debug)]
pub struct RecoverArgs {}

impl RecoverArgs {
    /// Execute the recover command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        tracing::info!(ledger_dir = %config.ingest.ledger_dir.display(), "Recovering interrupted jobs");
        let recovered = recover_interrupted(&config.ingest.ledger_dir)?;

        if recovered.is_empty() {
            println!("✅ No interrupted jobs found");
        } else {
            println!("Marked {} interrupted job(s) as failed:", recovered.len());
            for job_id in recovered {
                println!("  {job_id}");
            }
        }
        Ok(0)
    }
}
