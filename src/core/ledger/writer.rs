//! Single writer of a job's ledger

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use super::index::write_index;
use super::log::{format_line, progress_message, LogLevel};
use super::status::{StatusManifest, TIME_SPEND_PREFIX};
use super::{JobState, LedgerPaths};
use crate::domain::{IngestError, JobId, Result, UploadJob};

/// Append-only ledger of one job
///
/// Writes are accepted while the job is `pending` or `running`. After
/// [`JobLedger::fatal`] or [`JobLedger::done`] every write fails with
/// [`IngestError::LedgerClosed`].
///
/// The log file handle is opened on the first append and released at the
/// terminal transition, so accepted jobs waiting to run hold no descriptor.
#[derive(Debug)]
pub struct JobLedger {
    manifest: StatusManifest,
    log: Option<File>,
    indexes_sealed: bool,
}

impl JobLedger {
    /// Creates the ledger of a newly accepted job in state `pending`
    pub fn create(ledger_dir: &Path, job: &UploadJob) -> Result<Self> {
        fs::create_dir_all(ledger_dir).map_err(|e| {
            IngestError::Ledger(format!(
                "Failed to create ledger directory {}: {}",
                ledger_dir.display(),
                e
            ))
        })?;

        let paths = LedgerPaths::new(ledger_dir, &job.id);
        OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&paths.log)
            .map_err(|e| {
                IngestError::Ledger(format!(
                    "Cannot create log {} for job {}: {}",
                    paths.log.display(),
                    job.id,
                    e
                ))
            })?;

        let manifest = StatusManifest::new(job.clone(), paths);
        manifest.save()?;

        Ok(Self {
            manifest,
            log: None,
            indexes_sealed: false,
        })
    }

    /// Reopens the ledger of an existing job for further writes
    pub fn open(ledger_dir: &Path, job_id: &JobId) -> Result<Self> {
        let paths = LedgerPaths::new(ledger_dir, job_id);
        let manifest = StatusManifest::load(&paths.status)?;
        if !manifest.paths.log.exists() {
            return Err(IngestError::Ledger(format!(
                "Log {} of job {} is missing",
                manifest.paths.log.display(),
                job_id
            )));
        }
        let indexes_sealed = manifest.paths.inserts.exists() || manifest.paths.updates.exists();
        Ok(Self {
            manifest,
            log: None,
            indexes_sealed,
        })
    }

    pub fn job(&self) -> &UploadJob {
        &self.manifest.job
    }

    pub fn state(&self) -> JobState {
        self.manifest.status
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.manifest.paths
    }

    /// `pending -> running`
    pub fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.manifest.status != JobState::Pending {
            return Err(self.invalid_transition(JobState::Running));
        }
        self.transition(JobState::Running)?;
        self.append(
            LogLevel::Info,
            &format!("Job {} started for {}", self.manifest.job.id, self.manifest.job.file_name()),
        )
    }

    pub fn debug(&mut self, message: &str) -> Result<()> {
        self.append(LogLevel::Debug, message)
    }

    pub fn info(&mut self, message: &str) -> Result<()> {
        self.append(LogLevel::Info, message)
    }

    pub fn warning(&mut self, message: &str) -> Result<()> {
        self.append(LogLevel::Warning, message)
    }

    /// Records the share of rows processed, capped at `100.00%`
    pub fn progress(&mut self, rowcount: u64, total: u64) -> Result<()> {
        let message = progress_message(rowcount, total);
        self.append(LogLevel::Progress, &message)
    }

    /// Records the source file checksum in the log and the manifest
    pub fn record_checksum(&mut self, sha256: &str) -> Result<()> {
        self.append(LogLevel::Debug, &format!("sha256: {sha256}"))?;
        self.manifest.source_sha256 = Some(sha256.to_string());
        self.manifest.save()
    }

    /// Notes in the manifest that a residue file of dropped rows exists
    pub fn record_residue(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.manifest.residue_written {
            self.manifest.residue_written = true;
            self.manifest.save()?;
        }
        Ok(())
    }

    /// Appends an ERROR line and moves `running -> error`
    pub fn fatal(&mut self, message: &str) -> Result<()> {
        self.ensure_open()?;
        if self.manifest.status != JobState::Running {
            return Err(self.invalid_transition(JobState::Error));
        }
        self.append(LogLevel::Error, message)?;
        self.close_log()?;
        self.transition(JobState::Error)
    }

    /// Writes both id indexes, each atomically and exactly once
    ///
    /// Only allowed while running, before [`JobLedger::done`].
    pub fn seal_indexes(&mut self, inserted: &[i64], updated: &[i64]) -> Result<()> {
        self.ensure_open()?;
        if self.manifest.status != JobState::Running {
            return Err(IngestError::Ledger(format!(
                "Indexes of job {} can only be written while running (status: {})",
                self.manifest.job.id, self.manifest.status
            )));
        }
        if self.indexes_sealed {
            return Err(IngestError::Ledger(format!(
                "Indexes of job {} were already written",
                self.manifest.job.id
            )));
        }
        write_index(&self.manifest.paths.inserts, inserted)?;
        if let Err(e) = write_index(&self.manifest.paths.updates, updated) {
            // Both indexes or neither
            if let Err(cleanup) = fs::remove_file(&self.manifest.paths.inserts) {
                tracing::warn!(
                    job_id = %self.manifest.job.id,
                    error = %cleanup,
                    "Could not remove inserts index after a failed updates index"
                );
            }
            return Err(e);
        }
        self.indexes_sealed = true;
        Ok(())
    }

    /// Appends the elapsed time and the SUCCESS line, then moves to `success`
    pub fn done(&mut self, inserted: u64, elapsed_seconds: f64) -> Result<()> {
        self.ensure_open()?;
        if self.manifest.status != JobState::Running {
            return Err(self.invalid_transition(JobState::Success));
        }
        self.append(LogLevel::Debug, &format!("{TIME_SPEND_PREFIX}{elapsed_seconds}"))?;
        let message = format!(
            "{}: {} inserts in {:.2} seconds.",
            self.manifest.job.file_name(),
            inserted,
            elapsed_seconds
        );
        self.append(LogLevel::Success, &message)?;
        self.close_log()?;
        self.transition(JobState::Success)
    }

    fn append(&mut self, level: LogLevel, message: &str) -> Result<()> {
        self.ensure_open()?;
        let log = match self.log.as_mut() {
            Some(log) => log,
            None => {
                let file = OpenOptions::new().append(true).open(&self.manifest.paths.log)?;
                self.log.insert(file)
            }
        };
        log.write_all(format_line(level, message).as_bytes())?;
        Ok(())
    }

    /// Syncs and releases the log handle
    fn close_log(&mut self) -> Result<()> {
        if let Some(log) = self.log.take() {
            log.sync_data()?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.manifest.status.is_terminal() {
            return Err(IngestError::LedgerClosed {
                job_id: self.manifest.job.id.to_string(),
                status: self.manifest.status.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: JobState) -> Result<()> {
        self.manifest.status = to;
        self.manifest.updated_at = Utc::now();
        self.manifest.save()
    }

    fn invalid_transition(&self, to: JobState) -> IngestError {
        IngestError::InvalidTransition {
            from: self.manifest.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::status::JobStatus;
    use crate::domain::{Disease, UploadJobBuilder};
    use tempfile::TempDir;

    fn job() -> UploadJob {
        UploadJobBuilder::new()
            .disease(Disease::Dengue)
            .year(2024)
            .source("/uploads/dengue.csv")
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_starts_pending() {
        let dir = TempDir::new().unwrap();
        let job = job();
        let ledger = JobLedger::create(dir.path(), &job).unwrap();
        assert_eq!(ledger.state(), JobState::Pending);

        let status = JobStatus::load(dir.path(), &job.id).unwrap();
        assert_eq!(status.state(), JobState::Pending);
        assert_eq!(status.status_code(), 0);
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        let job = job();
        JobLedger::create(dir.path(), &job).unwrap();
        assert!(JobLedger::create(dir.path(), &job).is_err());
    }

    #[test]
    fn test_success_path() {
        let dir = TempDir::new().unwrap();
        let job = job();
        let mut ledger = JobLedger::create(dir.path(), &job).unwrap();
        ledger.start().unwrap();
        ledger.progress(150, 100).unwrap();
        ledger.seal_indexes(&[10, 11], &[3]).unwrap();
        ledger.done(2, 1.5).unwrap();
        assert_eq!(ledger.state(), JobState::Success);

        let status = JobStatus::load(dir.path(), &job.id).unwrap();
        assert_eq!(status.status_code(), 1);
        assert_eq!(status.inserts().unwrap(), 2);
        assert_eq!(status.updates().unwrap(), 1);
        assert_eq!(status.time_spend().unwrap(), Some(1.5));

        let progress = status.read_logs(LogLevel::Progress, true).unwrap();
        assert_eq!(progress[0].message, "100.00%");

        let success = status.read_logs(LogLevel::Success, true).unwrap();
        assert_eq!(success[0].message, "dengue.csv: 2 inserts in 1.50 seconds.");
    }

    #[test]
    fn test_terminal_ledger_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        ledger.start().unwrap();
        ledger.fatal("boom").unwrap();
        assert_eq!(ledger.state(), JobState::Error);

        assert!(ledger.info("late").unwrap_err().is_ledger_closed());
        assert!(ledger.warning("late").unwrap_err().is_ledger_closed());
        assert!(ledger.progress(1, 2).unwrap_err().is_ledger_closed());
        assert!(ledger.fatal("again").unwrap_err().is_ledger_closed());
        assert!(ledger.done(0, 0.0).unwrap_err().is_ledger_closed());
        assert!(ledger.start().unwrap_err().is_ledger_closed());
        assert!(ledger.seal_indexes(&[], &[]).unwrap_err().is_ledger_closed());

        let errors = read_error_lines(dir.path(), &ledger);
        assert_eq!(errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_success_is_absorbing() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        ledger.start().unwrap();
        ledger.done(0, 0.1).unwrap();
        assert!(ledger.fatal("too late").unwrap_err().is_ledger_closed());
        assert_eq!(ledger.state(), JobState::Success);
    }

    #[test]
    fn test_invalid_transitions() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        assert!(matches!(
            ledger.done(0, 0.0),
            Err(IngestError::InvalidTransition { .. })
        ));
        ledger.start().unwrap();
        assert!(matches!(
            ledger.start(),
            Err(IngestError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_fatal_requires_running() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        assert!(matches!(
            ledger.fatal("rejected before start"),
            Err(IngestError::InvalidTransition { .. })
        ));
        assert_eq!(ledger.state(), JobState::Pending);
    }

    #[test]
    fn test_indexes_sealed_once() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        ledger.start().unwrap();
        ledger.seal_indexes(&[1], &[]).unwrap();
        assert!(matches!(
            ledger.seal_indexes(&[1], &[]),
            Err(IngestError::Ledger(_))
        ));
    }

    #[test]
    fn test_no_index_before_completion() {
        let dir = TempDir::new().unwrap();
        let job = job();
        let mut ledger = JobLedger::create(dir.path(), &job).unwrap();
        ledger.start().unwrap();
        ledger.info("working").unwrap();

        let status = JobStatus::load(dir.path(), &job.id).unwrap();
        assert_eq!(status.inserts().unwrap(), 0);
        assert!(!status.paths().inserts.exists());
        assert_eq!(status.inserts_ids(10).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_updates_index_leaves_no_inserts_index() {
        let dir = TempDir::new().unwrap();
        let job = job();
        let mut ledger = JobLedger::create(dir.path(), &job).unwrap();
        ledger.start().unwrap();
        fs::write(&ledger.paths().updates, b"stale").unwrap();

        assert!(matches!(
            ledger.seal_indexes(&[1, 2], &[3]),
            Err(IngestError::Ledger(_))
        ));
        assert!(!ledger.paths().inserts.exists());

        let status = JobStatus::load(dir.path(), &job.id).unwrap();
        assert_eq!(status.inserts().unwrap(), 0);
    }

    #[test]
    fn test_pending_ledger_holds_no_log_handle() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JobLedger::create(dir.path(), &job()).unwrap();
        assert!(ledger.log.is_none());
        assert!(ledger.paths().log.exists());

        ledger.start().unwrap();
        assert!(ledger.log.is_some());
        ledger.done(0, 0.1).unwrap();
        assert!(ledger.log.is_none());
    }

    #[test]
    fn test_reopened_ledger_appends() {
        let dir = TempDir::new().unwrap();
        let job = job();
        JobLedger::create(dir.path(), &job).unwrap();

        let mut ledger = JobLedger::open(dir.path(), &job.id).unwrap();
        ledger.start().unwrap();
        ledger.fatal("job interrupted").unwrap();
        assert_eq!(read_error_lines(dir.path(), &ledger), vec!["job interrupted".to_string()]);
    }

    fn read_error_lines(dir: &Path, ledger: &JobLedger) -> Vec<String> {
        let status = JobStatus::load(dir, &ledger.job().id).unwrap();
        status
            .read_logs(LogLevel::Error, true)
            .unwrap()
            .into_iter()
            .map(|l| l.message)
            .collect()
    }
}
