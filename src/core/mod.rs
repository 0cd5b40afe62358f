//! Core ingestion logic
//!
//! # Modules
//!
//! - [`columns`] - Field catalogue and the per-job column mapping
//! - [`source`] - Chunked readers for `.csv`, `.dbf` and `.parquet` files
//! - [`parse`] - Row coercion into typed notification records
//! - [`ingest`] - Staging, upsert commit, pipeline and worker pool
//! - [`ledger`] - Per-job status ledger read by monitors
//! - [`verification`] - Source file checks and checksums
//!
//! # Job Workflow
//!
//! 1. **Accept**: create the job's ledger in `pending`
//! 2. **Move**: archive the source file, when configured
//! 3. **Verify**: check the file and record its SHA-256
//! 4. **Reconcile**: map the file's headers onto canonical fields
//! 5. **Stage**: read, parse and stage every chunk in one transaction
//! 6. **Commit**: merge the staging table with a single upsert
//! 7. **Seal**: write the id indexes and the SUCCESS line
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sinan_ingest::adapters::database::create_store;
//! use sinan_ingest::config::load_config;
//! use sinan_ingest::core::ingest::{IngestPipeline, WorkerPool};
//!
//! # async fn example(jobs: Vec<sinan_ingest::domain::UploadJob>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sinan-ingest.toml")?;
//! let store = create_store(&config)?;
//! store.ensure_schema().await?;
//!
//! let pipeline = Arc::new(IngestPipeline::new(store, config.ingest.clone()));
//! let summary = WorkerPool::new(pipeline).run_all(jobs).await;
//! println!("{}", summary.format_summary());
//! # Ok(())
//! # }
//! ```

pub mod columns;
pub mod ingest;
pub mod ledger;
pub mod parse;
pub mod source;
pub mod verification;
