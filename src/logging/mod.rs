//! Process logging
//!
//! Structured `tracing` diagnostics for operators: console plus optional
//! rolling JSON files. Job outcomes are recorded separately in each job's
//! ledger log (see [`crate::core::ledger`]), which is what monitors read.
//!
//! # Example
//!
//! ```no_run
//! use sinan_ingest::logging::init_logging;
//! use sinan_ingest::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Worker started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an ingestion job
///
/// ```no_run
/// use sinan_ingest::log_job_start;
///
/// log_job_start!("8f0c...", "dengue_2024.csv");
/// ```
#[macro_export]
macro_rules! log_job_start {
    ($job_id:expr, $file:expr) => {
        tracing::info!(
            job_id = %$job_id,
            file = %$file,
            "Starting ingestion job"
        );
    };
}

/// Log the completion of an ingestion job
///
/// ```no_run
/// use sinan_ingest::log_job_complete;
/// use std::time::Duration;
///
/// log_job_complete!("8f0c...", 10, 2, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_job_complete {
    ($job_id:expr, $inserted:expr, $updated:expr, $duration:expr) => {
        tracing::info!(
            job_id = %$job_id,
            inserted = $inserted,
            updated = $updated,
            duration_ms = $duration.as_millis() as u64,
            "Ingestion job completed"
        );
    };
}

/// Log one chunk staged into the job's staging table
///
/// ```no_run
/// use sinan_ingest::log_chunk_staged;
///
/// log_chunk_staged!("8f0c...", 3, 99_870, 130);
/// ```
#[macro_export]
macro_rules! log_chunk_staged {
    ($job_id:expr, $chunk:expr, $staged:expr, $dropped:expr) => {
        tracing::debug!(
            job_id = %$job_id,
            chunk = $chunk,
            staged = $staged,
            dropped = $dropped,
            "Chunk staged"
        );
    };
}
