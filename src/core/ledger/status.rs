//! Job status: the manifest on disk and the read-only monitor view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::index::{index_count, IdChunks, IndexReader};
use super::log::{read_logs, LogLevel, LogLine};
use super::writer::JobLedger;
use super::{JobState, LedgerPaths};
use crate::domain::{IngestError, JobId, Result, UploadJob};

/// Prefix of the DEBUG line recording elapsed seconds
pub const TIME_SPEND_PREFIX: &str = "time_spend: ";

/// Persisted status of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusManifest {
    pub job: UploadJob,
    pub status: JobState,
    pub paths: LedgerPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    #[serde(default)]
    pub residue_written: bool,
    pub updated_at: DateTime<Utc>,
}

impl StatusManifest {
    pub fn new(job: UploadJob, paths: LedgerPaths) -> Self {
        Self {
            job,
            status: JobState::Pending,
            paths,
            source_sha256: None,
            residue_written: false,
            updated_at: Utc::now(),
        }
    }

    /// Writes the manifest to `paths.status` through a temp file and rename
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp_name = self.paths.status.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.paths.status.with_file_name(tmp_name);

        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.paths.status)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            IngestError::Ledger(format!("Cannot read status manifest {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Read-only view of a job for monitoring surfaces
#[derive(Debug, Clone)]
pub struct JobStatus {
    manifest: StatusManifest,
}

impl JobStatus {
    /// Loads the status of `job_id` from the ledger directory
    pub fn load(ledger_dir: &Path, job_id: &JobId) -> Result<Self> {
        let paths = LedgerPaths::new(ledger_dir, job_id);
        if !paths.status.exists() {
            return Err(IngestError::Ledger(format!("Unknown job {job_id}")));
        }
        Self::from_manifest_file(&paths.status)
    }

    fn from_manifest_file(path: &Path) -> Result<Self> {
        Ok(Self {
            manifest: StatusManifest::load(path)?,
        })
    }

    /// Every job with a manifest in the ledger directory, oldest first
    pub fn list(ledger_dir: &Path) -> Result<Vec<Self>> {
        let mut jobs = Vec::new();
        if !ledger_dir.exists() {
            return Ok(jobs);
        }
        for entry in fs::read_dir(ledger_dir)? {
            let path = entry?.path();
            if is_manifest(&path) {
                jobs.push(Self::from_manifest_file(&path)?);
            }
        }
        jobs.sort_by_key(|s| s.manifest.job.created_at);
        Ok(jobs)
    }

    pub fn job(&self) -> &UploadJob {
        &self.manifest.job
    }

    pub fn state(&self) -> JobState {
        self.manifest.status
    }

    /// 0 pending/running, 1 success, 2 error
    pub fn status_code(&self) -> u8 {
        self.manifest.status.code()
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.manifest.paths
    }

    pub fn source_sha256(&self) -> Option<&str> {
        self.manifest.source_sha256.as_deref()
    }

    pub fn residue_file(&self) -> Option<&Path> {
        self.manifest
            .residue_written
            .then_some(self.manifest.paths.residue.as_path())
    }

    /// Number of inserted rows, zero until the index exists
    pub fn inserts(&self) -> Result<u64> {
        index_count(&self.manifest.paths.inserts)
    }

    /// Number of updated rows, zero until the index exists
    pub fn updates(&self) -> Result<u64> {
        index_count(&self.manifest.paths.updates)
    }

    /// Elapsed seconds recorded in the `time_spend:` DEBUG line
    pub fn time_spend(&self) -> Result<Option<f64>> {
        let lines = read_logs(&self.manifest.paths.log, LogLevel::Debug, true)?;
        Ok(lines.iter().rev().find_map(|line| {
            line.message
                .strip_prefix(TIME_SPEND_PREFIX)
                .and_then(|v| v.trim().parse::<f64>().ok())
        }))
    }

    /// Log lines at or above `level`, or exactly `level` with `only_level`
    pub fn read_logs(&self, level: LogLevel, only_level: bool) -> Result<Vec<LogLine>> {
        read_logs(&self.manifest.paths.log, level, only_level)
    }

    /// Message of the first ERROR line, shown to users when a job fails
    pub fn first_error(&self) -> Result<Option<String>> {
        Ok(self
            .read_logs(LogLevel::Error, true)?
            .into_iter()
            .next()
            .map(|line| line.message))
    }

    /// Inserted ids in chunks of `chunk_size`
    pub fn inserts_ids(&self, chunk_size: usize) -> Result<IdChunks> {
        id_chunks(&self.manifest.paths.inserts, chunk_size)
    }

    /// Updated ids in chunks of `chunk_size`
    pub fn updates_ids(&self, chunk_size: usize) -> Result<IdChunks> {
        id_chunks(&self.manifest.paths.updates, chunk_size)
    }
}

fn id_chunks(path: &Path, chunk_size: usize) -> Result<IdChunks> {
    if chunk_size == 0 {
        return Err(IngestError::Validation("chunk size must be > 0".to_string()));
    }
    if !path.exists() {
        return Ok(IdChunks::empty(chunk_size));
    }
    Ok(IndexReader::open(path)?.chunks(chunk_size))
}

fn is_manifest(path: &PathBuf) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".status.json"))
        .unwrap_or(false)
}

/// Seals jobs a crashed worker left `running`
///
/// Each one gets an ERROR line and moves to `error`, so it is terminal and
/// the file can be resubmitted. Pending jobs are left for the scheduler.
/// Must not run while workers share the ledger directory.
pub fn recover_interrupted(ledger_dir: &Path) -> Result<Vec<JobId>> {
    let mut recovered = Vec::new();
    for status in JobStatus::list(ledger_dir)? {
        if status.state() != JobState::Running {
            continue;
        }
        let job_id = status.job().id;
        let mut ledger = JobLedger::open(ledger_dir, &job_id)?;
        ledger.fatal("Job interrupted before completion; resubmit the file")?;
        tracing::warn!(job_id = %job_id, "Marked interrupted job as failed");
        recovered.push(job_id);
    }
    Ok(recovered)
}
