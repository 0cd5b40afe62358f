//! Worker pool running jobs concurrently
//!
//! Up to `max_parallel_jobs` jobs run at once. Jobs share only the
//! destination store; each is strictly sequential inside.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};

use super::pipeline::IngestPipeline;
use super::summary::{IngestSummary, JobOutcome};
use crate::domain::UploadJob;

pub struct WorkerPool {
    pipeline: Arc<IngestPipeline>,
    max_parallel_jobs: usize,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        let max_parallel_jobs = pipeline.config().max_parallel_jobs.max(1);
        Self {
            pipeline,
            max_parallel_jobs,
        }
    }

    pub fn with_max_parallel_jobs(mut self, n: usize) -> Self {
        self.max_parallel_jobs = n.max(1);
        self
    }

    /// Accepts every job, then runs them to completion
    ///
    /// All ledgers exist in `pending` before the first job starts, so a
    /// monitor can see the whole submission at once. A job whose ledger
    /// cannot be created or written is reported as failed.
    pub async fn run_all(&self, jobs: Vec<UploadJob>) -> IngestSummary {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut accepted = Vec::with_capacity(jobs.len());

        for job in jobs {
            match self.pipeline.accept(&job) {
                Ok(ledger) => accepted.push(ledger),
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to accept job");
                    outcomes.push(JobOutcome::failed(
                        job.id,
                        job.file_name(),
                        e.to_string(),
                        Default::default(),
                    ));
                }
            }
        }

        tracing::info!(
            jobs = accepted.len(),
            concurrency = self.max_parallel_jobs,
            "Running ingestion jobs"
        );

        let finished: Vec<JobOutcome> = stream::iter(accepted)
            .map(|ledger| {
                let pipeline = Arc::clone(&self.pipeline);
                let job_id = ledger.job().id;
                let file = ledger.job().file_name();
                async move {
                    let job_started = Instant::now();
                    match pipeline.run_accepted(ledger).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(job_id = %job_id, error = %e, "Job ledger could not be written");
                            JobOutcome::failed(job_id, file, e.to_string(), job_started.elapsed())
                        }
                    }
                }
            })
            .buffer_unordered(self.max_parallel_jobs)
            .collect()
            .await;

        outcomes.extend(finished);
        IngestSummary::new(outcomes, started.elapsed())
    }
}
