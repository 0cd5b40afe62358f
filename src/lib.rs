// sinan-ingest - SINAN Notification Ingestion Pipeline
// Copyright (c) 2025 sinan-ingest Contributors
// Licensed under the MIT License

//! # sinan-ingest - SINAN notification ingestion
//!
//! sinan-ingest loads case-notification files exported from SINAN (dengue,
//! chikungunya and zika) into a PostgreSQL notification table. Files with
//! drifting column layouts are reconciled against a canonical field
//! catalogue, streamed in bounded chunks, coerced row by row, staged in a
//! per-job temporary table and merged with a single upsert keyed on
//! (notification number, notification date, disease code, municipality).
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Columns, readers, parser, pipeline, ledger, verification
//! - [`adapters`] - Destination stores (PostgreSQL, in-memory)
//! - [`domain`] - Errors, identifiers, jobs and notification records
//! - [`config`] - Configuration management
//! - [`logging`] - Structured process logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sinan_ingest::adapters::database::create_store;
//! use sinan_ingest::config::load_config;
//! use sinan_ingest::core::ingest::IngestPipeline;
//! use sinan_ingest::domain::{Disease, UploadJobBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("sinan-ingest.toml")?;
//!     let store = create_store(&config)?;
//!     store.ensure_schema().await?;
//!
//!     let job = UploadJobBuilder::new()
//!         .disease(Disease::Dengue)
//!         .year(2024)
//!         .source("DENGBR24.dbf")
//!         .build()?;
//!
//!     let pipeline = IngestPipeline::new(store, config.ingest.clone());
//!     let outcome = pipeline.run(&job).await?;
//!     println!("{}: {} inserted, {} updated", outcome.state, outcome.inserted, outcome.updated);
//!     Ok(())
//! }
//! ```
//!
//! ## Monitoring
//!
//! Each job leaves a ledger in `ingest.ledger_dir`: a leveled text log, a
//! status manifest and, on success, two binary id indexes. Monitors read
//! them through [`core::ledger::JobStatus`]:
//!
//! ```rust,no_run
//! use sinan_ingest::core::ledger::{JobStatus, LogLevel};
//! use sinan_ingest::domain::JobId;
//! use std::path::Path;
//!
//! # fn example(job_id: JobId) -> sinan_ingest::domain::Result<()> {
//! let status = JobStatus::load(Path::new("./ledger"), &job_id)?;
//! println!("status {} inserts {}", status.status_code(), status.inserts()?);
//! for line in status.read_logs(LogLevel::Warning, false)? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
