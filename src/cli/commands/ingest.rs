//! Ingest command implementation
//!
//! Creates one job per file and runs them through the worker pool.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::adapters::database::create_store;
use crate::config::load_config;
use crate::core::ingest::{IngestPipeline, WorkerPool};
use crate::domain::{Disease, Uf, UploadJob, UploadJobBuilder};

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Source files (.csv, .dbf or .parquet)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Disease notified in the files (dengue, chikungunya, zika or a CID-10 code)
    #[arg(long)]
    pub disease: Disease,

    /// Notification year
    #[arg(long)]
    pub year: i32,

    /// Federative unit of the files; omit for nationwide files
    #[arg(long)]
    pub uf: Option<Uf>,

    /// Identity recorded as the owner of the jobs
    #[arg(long, env = "SINAN_OWNER", default_value = "anonymous")]
    pub owner: String,

    /// Dry run mode - stage and commit into memory only
    #[arg(long)]
    pub dry_run: bool,

    /// Override the number of jobs run concurrently
    #[arg(long)]
    pub parallel: Option<usize>,
}

impl IngestArgs {
    fn build_jobs(&self) -> Result<Vec<UploadJob>, String> {
        self.files
            .iter()
            .map(|file| {
                UploadJobBuilder::new()
                    .disease(self.disease)
                    .uf(self.uf)
                    .year(self.year)
                    .source(file.clone())
                    .owner(self.owner.clone())
                    .build()
                    .map_err(|e| format!("{}: {e}", file.display()))
            })
            .collect()
    }

    /// Execute the ingest command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(files = self.files.len(), disease = %self.disease, "Starting ingest command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if let Some(parallel) = self.parallel {
            config.ingest.max_parallel_jobs = parallel;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let jobs = match self.build_jobs() {
            Ok(jobs) => jobs,
            Err(e) => {
                eprintln!("Invalid job: {e}");
                return Ok(2);
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to the database");
            println!();
        }

        let store = match create_store(&config) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Failed to initialize destination: {e}");
                return Ok(4);
            }
        };
        if let Err(e) = store.test_connection().await {
            tracing::error!(error = %e, "Destination connection test failed");
            eprintln!("Failed to connect to destination: {e}");
            return Ok(4);
        }
        store.ensure_schema().await?;

        let pipeline = Arc::new(IngestPipeline::new(store, config.ingest.clone()));
        let pool = WorkerPool::new(pipeline);

        println!("🚀 Ingesting {} file(s)...", jobs.len());
        for job in &jobs {
            println!("  {} {}", job.id, job.source.display());
        }
        println!();

        let summary = pool.run_all(jobs).await;
        summary.log_summary();
        println!("{}", summary.format_summary());

        Ok(if summary.is_successful() { 0 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(files: &[&str], year: i32) -> IngestArgs {
        IngestArgs {
            files: files.iter().map(PathBuf::from).collect(),
            disease: Disease::Chikungunya,
            year,
            uf: Some("RJ".parse().unwrap()),
            owner: "tester".to_string(),
            dry_run: true,
            parallel: None,
        }
    }

    #[test]
    fn test_one_job_per_file() {
        let jobs = args(&["a.csv", "b.dbf"], 2023).build_jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_ne!(jobs[0].id, jobs[1].id);
        assert_eq!(jobs[1].source, PathBuf::from("b.dbf"));
        assert!(jobs.iter().all(|j| j.owner == "tester" && j.uf.is_some()));
    }

    #[test]
    fn test_invalid_year_names_file() {
        let err = args(&["a.csv"], 1900).build_jobs().unwrap_err();
        assert!(err.starts_with("a.csv:"));
    }
}
