//! Ingestion pipeline
//!
//! Runs one accepted job through move, verify, reconcile, stage and commit.
//! Every step reports to the job's ledger; the first error ends the job in
//! `error` with the cause as its ERROR line, and anything staged is rolled
//! back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::commit::{commit, CommitOutcome};
use super::residue::ResidueWriter;
use super::staging::StagingLoader;
use super::summary::JobOutcome;
use crate::adapters::database::NotificationStore;
use crate::config::PipelineConfig;
use crate::core::columns::ColumnMapping;
use crate::core::ledger::{JobLedger, JobState};
use crate::core::parse::{JobContext, RecordParser};
use crate::core::source::{RawBatch, SourceReader};
use crate::core::verification::verify_source;
use crate::domain::context::ResultExt;
use crate::domain::{IngestError, Result, SourceError, UploadJob};
use crate::{log_chunk_staged, log_job_complete, log_job_start};

/// Batches read ahead of the parser
const READ_AHEAD: usize = 2;

/// Row totals accumulated while staging
#[derive(Debug, Default)]
struct StageTally {
    rows_read: u64,
    dropped: u64,
    residue: bool,
}

/// Pipeline bound to one destination store
pub struct IngestPipeline {
    store: Arc<dyn NotificationStore>,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn NotificationStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    /// Accepts a job: creates its ledger in `pending`
    pub fn accept(&self, job: &UploadJob) -> Result<JobLedger> {
        let ledger = JobLedger::create(&self.config.ledger_dir, job)?;
        tracing::debug!(job_id = %job.id, file = %job.file_name(), "Job accepted");
        Ok(ledger)
    }

    /// Accepts and runs a job
    pub async fn run(&self, job: &UploadJob) -> Result<JobOutcome> {
        let ledger = self.accept(job)?;
        self.run_accepted(ledger).await
    }

    /// Runs an accepted job to a terminal state
    ///
    /// Job failures are recorded in the ledger and returned as an outcome in
    /// state `error`. `Err` means the ledger itself could not be written.
    pub async fn run_accepted(&self, mut ledger: JobLedger) -> Result<JobOutcome> {
        let started = Instant::now();
        let job = ledger.job().clone();
        log_job_start!(job.id, job.file_name());
        ledger.start()?;

        match self.execute(&mut ledger, &job, started).await {
            Ok(outcome) => {
                log_job_complete!(job.id, outcome.inserted, outcome.updated, outcome.duration);
                Ok(outcome)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(job_id = %job.id, error = %message, "Ingestion job failed");
                ledger.fatal(&message)?;
                Ok(JobOutcome::failed(job.id, job.file_name(), message, started.elapsed()))
            }
        }
    }

    async fn execute(
        &self,
        ledger: &mut JobLedger,
        job: &UploadJob,
        started: Instant,
    ) -> Result<JobOutcome> {
        let source = match &self.config.archive_dir {
            Some(dir) => {
                let archived = archive_source(&job.source, &dir.join(job.archive_file_name())).await?;
                ledger.info(&format!("File moved to {}", archived.display()))?;
                archived
            }
            None => job.source.clone(),
        };

        let path = source.clone();
        let check = blocking(move || verify_source(&path)).await?;
        ledger.record_checksum(&check.sha256)?;

        let path = source.clone();
        let reader = blocking(move || SourceReader::open(&path)).await?;
        let mapping = ColumnMapping::reconcile(reader.headers())?;
        for warning in mapping.warnings() {
            ledger.warning(&warning)?;
        }
        ledger.debug(&format!(
            "Reading {} file ({} bytes, {} columns)",
            check.format,
            check.size_bytes,
            reader.headers().len()
        ))?;

        let total = reader.total_rows();
        let mut residue = ResidueWriter::new(&ledger.paths().residue, reader.headers());
        let parser = Arc::new(RecordParser::new(mapping, JobContext::from(job)));

        let session = self.store.begin_staging(&job.id).await?;
        let mut loader = StagingLoader::new(session);
        let mut batches = reader
            .into_chunks(&source, self.config.chunk_size)
            .spawn(READ_AHEAD);

        let staged = stage_all(
            ledger,
            job,
            &mut loader,
            &mut batches,
            parser,
            &mut residue,
            total,
        )
        .await;
        drop(batches);

        let tally = match staged {
            Ok(tally) => tally,
            Err(e) => {
                if let Err(rollback) = loader.rollback().await {
                    tracing::warn!(job_id = %job.id, error = %rollback, "Rollback of staged rows failed");
                }
                return Err(e);
            }
        };

        ledger.debug(&format!(
            "Staged {} row(s) in {} chunk(s), {} replaced by a later row with the same key",
            loader.rows_staged(),
            loader.batches(),
            loader.duplicates_in_batches()
        ))?;

        let CommitOutcome { inserted, updated } = commit(loader).await?;
        let duration = complete(ledger, job, &inserted, &updated, started).with_context(|| {
            format!(
                "{} inserted and {} updated row(s) were committed to the destination, \
                 but the job ledger could not be completed",
                inserted.len(),
                updated.len()
            )
        })?;

        Ok(JobOutcome {
            job_id: job.id,
            file: job.file_name(),
            state: JobState::Success,
            rows_read: tally.rows_read,
            dropped: tally.dropped,
            inserted: inserted.len() as u64,
            updated: updated.len() as u64,
            duration,
            residue: tally.residue.then(|| residue.path().to_path_buf()),
            error: None,
        })
    }
}

/// Ledger steps after the destination commit
fn complete(
    ledger: &mut JobLedger,
    job: &UploadJob,
    inserted: &[i64],
    updated: &[i64],
    started: Instant,
) -> Result<Duration> {
    ledger.seal_indexes(inserted, updated)?;
    ledger.info(&format!("{}: {} updates.", job.file_name(), updated.len()))?;
    let duration = started.elapsed();
    ledger.done(inserted.len() as u64, duration.as_secs_f64())?;
    Ok(duration)
}

/// Parses and stages every batch in file order
async fn stage_all(
    ledger: &mut JobLedger,
    job: &UploadJob,
    loader: &mut StagingLoader,
    batches: &mut mpsc::Receiver<Result<RawBatch>>,
    parser: Arc<RecordParser>,
    residue: &mut ResidueWriter,
    total: Option<u64>,
) -> Result<StageTally> {
    let mut tally = StageTally::default();

    while let Some(batch) = batches.recv().await {
        let batch = batch?;
        let parser = Arc::clone(&parser);
        let parsed = blocking(move || Ok(parser.parse_batch(batch))).await?;

        if let Some(warning) = parsed.drops.warning(parsed.index) {
            ledger.warning(&warning)?;
        }
        if let Some(warning) = parsed.uf_warning(job.uf) {
            ledger.warning(&warning)?;
        }
        if !parsed.dropped.is_empty() {
            residue.write(&parsed.dropped)?;
            ledger.record_residue()?;
        }

        let staged = loader.stage(&parsed.records).await?;
        log_chunk_staged!(job.id, parsed.index, staged, parsed.drops.total());

        tally.rows_read += parsed.rows_read as u64;
        tally.dropped += parsed.drops.total() as u64;
        match total {
            Some(total) => ledger.progress(tally.rows_read, total)?,
            None => ledger.debug(&format!(
                "Chunk {}: {} rows read",
                parsed.index + 1,
                tally.rows_read
            ))?,
        }
    }

    tally.residue = residue.finish()?;
    Ok(tally)
}

/// Moves the source into the archive, copying across filesystems
async fn archive_source(source: &Path, target: &Path) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create archive directory {}", parent.display()))?;
    }

    match tokio::fs::rename(source, target).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::NotFound(source.to_path_buf()).into());
        }
        Err(_) => {
            tokio::fs::copy(source, target).await.with_context(|| {
                format!("Failed to move {} to {}", source.display(), target.display())
            })?;
            tokio::fs::remove_file(source)
                .await
                .with_context(|| format!("Failed to remove {}", source.display()))?;
        }
    }

    tracing::debug!(from = %source.display(), to = %target.display(), "Source file archived");
    Ok(target.to_path_buf())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IngestError::Other(format!("Blocking task failed: {e}")))?
}
