//! Job outcomes and run summaries
//!
//! A [`JobOutcome`] is the in-process view of one finished job; monitors read
//! the ledger instead. [`IngestSummary`] aggregates the outcomes of one
//! `ingest` invocation.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::ledger::JobState;
use crate::domain::JobId;

/// Result of running one job to a terminal state
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,

    /// Source file name as submitted
    pub file: String,

    /// Terminal state reached (`success` or `error`)
    pub state: JobState,

    pub rows_read: u64,
    pub dropped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub duration: Duration,

    /// Residue file of dropped rows, when any row was dropped
    pub residue: Option<PathBuf>,

    /// Cause recorded in the ERROR line
    pub error: Option<String>,
}

impl JobOutcome {
    pub(crate) fn failed(job_id: JobId, file: String, error: String, duration: Duration) -> Self {
        Self {
            job_id,
            file,
            state: JobState::Error,
            rows_read: 0,
            dropped: 0,
            inserted: 0,
            updated: 0,
            duration,
            residue: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Success
    }
}

/// Aggregate over the jobs of one invocation
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub jobs: Vec<JobOutcome>,
    pub duration: Duration,
}

impl IngestSummary {
    pub fn new(jobs: Vec<JobOutcome>, duration: Duration) -> Self {
        Self { jobs, duration }
    }

    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    pub fn total_inserted(&self) -> u64 {
        self.jobs.iter().map(|j| j.inserted).sum()
    }

    pub fn total_updated(&self) -> u64 {
        self.jobs.iter().map(|j| j.updated).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.jobs.iter().map(|j| j.dropped).sum()
    }

    /// Check if every job succeeded
    pub fn is_successful(&self) -> bool {
        self.failed() == 0
    }

    /// Human-readable report printed by the `ingest` command
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        out.push_str("Ingestion summary\n");
        out.push_str("=================\n");
        out.push_str(&format!(
            "Jobs: {} ({} succeeded, {} failed)\n",
            self.jobs.len(),
            self.succeeded(),
            self.failed()
        ));
        out.push_str(&format!(
            "Rows: {} inserted, {} updated, {} dropped\n",
            self.total_inserted(),
            self.total_updated(),
            self.total_dropped()
        ));
        out.push_str(&format!("Duration: {:.2}s\n", self.duration.as_secs_f64()));

        for job in &self.jobs {
            out.push('\n');
            out.push_str(&format!("  {} [{}] {}\n", job.job_id, job.state, job.file));
            match &job.error {
                Some(error) => out.push_str(&format!("    error: {error}\n")),
                None => out.push_str(&format!(
                    "    read {} rows, {} inserted, {} updated, {} dropped in {:.2}s\n",
                    job.rows_read,
                    job.inserted,
                    job.updated,
                    job.dropped,
                    job.duration.as_secs_f64()
                )),
            }
            if let Some(residue) = &job.residue {
                out.push_str(&format!("    dropped rows: {}\n", residue.display()));
            }
        }
        out
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            jobs = self.jobs.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            inserted = self.total_inserted(),
            updated = self.total_updated(),
            dropped = self.total_dropped(),
            duration_secs = self.duration.as_secs(),
            "Ingestion run completed"
        );
        for job in self.jobs.iter().filter(|j| !j.is_success()) {
            tracing::warn!(
                job_id = %job.job_id,
                file = %job.file,
                error = job.error.as_deref().unwrap_or_default(),
                "Job failed"
            );
        }
    }
}
