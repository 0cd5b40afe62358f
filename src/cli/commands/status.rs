//! Status command implementation
//!
//! Reads the ledger only: the job table, one job's log lines, or its id
//! indexes page by page.

use std::path::Path;

use clap::{Args, ValueEnum};

use crate::config::load_config;
use crate::core::ledger::{JobStatus, LogLevel};
use crate::domain::{JobId, Result};

/// Which id index to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdIndex {
    Inserts,
    Updates,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job to show; omit to list every job in the ledger
    pub job_id: Option<JobId>,

    /// Print log lines at or above this level
    #[arg(long, value_name = "LEVEL")]
    pub logs: Option<LogLevel>,

    /// With --logs, print only lines of exactly that level
    #[arg(long)]
    pub only: bool,

    /// Print the ids of an index
    #[arg(long, value_enum)]
    pub ids: Option<IdIndex>,

    /// Ids per printed line
    #[arg(long, default_value_t = 1000)]
    pub chunk: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        let ledger_dir = config.ingest.ledger_dir.as_path();

        let result = match &self.job_id {
            None => list_jobs(ledger_dir),
            Some(job_id) => self.show_job(ledger_dir, job_id),
        };

        match result {
            Ok(()) => Ok(0),
            Err(e) => {
                println!("❌ {e}");
                Ok(5)
            }
        }
    }

    fn show_job(&self, ledger_dir: &Path, job_id: &JobId) -> Result<()> {
        let status = JobStatus::load(ledger_dir, job_id)?;
        let job = status.job();

        println!("📊 Job {}", job.id);
        println!();
        println!("  File:      {}", job.file_name());
        println!("  Disease:   {}", job.disease);
        println!(
            "  UF:        {}",
            job.uf.map(|uf| uf.to_string()).unwrap_or_else(|| "BR".to_string())
        );
        println!("  Year:      {}", job.year);
        println!("  Owner:     {}", job.owner);
        println!("  Status:    {} ({})", status.state(), status.status_code());
        println!("  Inserts:   {}", status.inserts()?);
        println!("  Updates:   {}", status.updates()?);
        if let Some(secs) = status.time_spend()? {
            println!("  Time:      {secs:.2}s");
        }
        if let Some(sha) = status.source_sha256() {
            println!("  SHA-256:   {sha}");
        }
        if let Some(residue) = status.residue_file() {
            println!("  Dropped:   {}", residue.display());
        }
        if let Some(error) = status.first_error()? {
            println!("  Error:     {error}");
        }

        if let Some(level) = self.logs {
            println!();
            for line in status.read_logs(level, self.only)? {
                println!("{line}");
            }
        }

        if let Some(index) = self.ids {
            let chunks = match index {
                IdIndex::Inserts => status.inserts_ids(self.chunk)?,
                IdIndex::Updates => status.updates_ids(self.chunk)?,
            };
            println!();
            for chunk in chunks {
                let ids: Vec<String> = chunk?.iter().map(|id| id.to_string()).collect();
                println!("{}", ids.join(","));
            }
        }
        Ok(())
    }
}

fn list_jobs(ledger_dir: &Path) -> Result<()> {
    let jobs = JobStatus::list(ledger_dir)?;
    if jobs.is_empty() {
        println!("No jobs found in {}.", ledger_dir.display());
        println!("Run 'sinan-ingest ingest' to submit files.");
        return Ok(());
    }

    println!("Found {} job(s):", jobs.len());
    println!();
    println!(
        "{:<34} {:<10} {:<12} {:<10} {:<10} {:<30}",
        "Job ID", "Status", "Disease", "Inserts", "Updates", "File"
    );
    println!("{}", "-".repeat(110));
    for status in jobs {
        let job = status.job();
        println!(
            "{:<34} {:<10} {:<12} {:<10} {:<10} {:<30}",
            job.id.as_file_stem(),
            status.state(),
            job.disease,
            status.inserts()?,
            status.updates()?,
            job.file_name()
        );
    }
    println!();
    Ok(())
}
