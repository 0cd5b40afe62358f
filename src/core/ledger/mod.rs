//! Status ledger
//!
//! Everything a monitor knows about a job comes from the files in the ledger
//! directory. For a job with id `J` (hyphen-less form):
//!
//! - `J.log` leveled text log, appended while the job is pending or running
//! - `J.inserts.ids` / `J.updates.ids` id indexes, written once at success
//! - `J.status.json` status manifest, rewritten atomically on each transition
//! - `J.residue.csv` rows dropped by the parser, only if any were dropped
//!
//! [`JobLedger`] is the single writer of these files; [`JobStatus`] is the
//! read side.

pub mod index;
pub mod log;
pub mod status;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::JobId;

pub use index::{index_count, write_index, IdChunks, IndexReader};
pub use log::{format_line, progress_message, read_logs, LogLevel, LogLine};
pub use status::{recover_interrupted, JobStatus, StatusManifest};
pub use writer::JobLedger;

/// Job state machine: `pending -> running -> {success, error}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Success,
    Error,
}

impl JobState {
    /// Numeric code exposed to monitors: 0 pending or running, 1 success, 2 error
    pub fn code(&self) -> u8 {
        match self {
            JobState::Pending | JobState::Running => 0,
            JobState::Success => 1,
            JobState::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Success => "success",
            JobState::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locations of one job's ledger artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPaths {
    pub log: PathBuf,
    pub inserts: PathBuf,
    pub updates: PathBuf,
    pub status: PathBuf,
    pub residue: PathBuf,
}

impl LedgerPaths {
    pub fn new(dir: &Path, job_id: &JobId) -> Self {
        let stem = job_id.as_file_stem();
        Self {
            log: dir.join(format!("{stem}.log")),
            inserts: dir.join(format!("{stem}.inserts.ids")),
            updates: dir.join(format!("{stem}.updates.ids")),
            status: dir.join(format!("{stem}.status.json")),
            residue: dir.join(format!("{stem}.residue.csv")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(JobState::Pending.code(), 0);
        assert_eq!(JobState::Running.code(), 0);
        assert_eq!(JobState::Success.code(), 1);
        assert_eq!(JobState::Error.code(), 2);
        assert!(JobState::Error.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn test_paths_share_job_stem() {
        let id = JobId::new();
        let paths = LedgerPaths::new(Path::new("/ledger"), &id);
        let stem = id.as_file_stem();
        assert_eq!(paths.log, PathBuf::from(format!("/ledger/{stem}.log")));
        assert!(paths.inserts.to_string_lossy().ends_with(".inserts.ids"));
        assert!(paths.status.to_string_lossy().ends_with(".status.json"));
    }
}
