//! Status ledger behaviour as seen by monitors

use std::path::Path;

use sinan_ingest::core::ledger::{
    progress_message, recover_interrupted, JobLedger, JobState, JobStatus, LogLevel,
};
use sinan_ingest::domain::{Disease, IngestError, UploadJob, UploadJobBuilder};
use tempfile::TempDir;

fn job() -> UploadJob {
    UploadJobBuilder::new()
        .disease(Disease::Chikungunya)
        .year(2023)
        .source("/uploads/CHIKBR23.parquet")
        .build()
        .unwrap()
}

fn running(dir: &Path) -> (UploadJob, JobLedger) {
    let job = job();
    let mut ledger = JobLedger::create(dir, &job).unwrap();
    ledger.start().unwrap();
    (job, ledger)
}

#[test]
fn test_progress_is_capped() {
    assert_eq!(progress_message(150, 100), "100.00%");
    assert_eq!(progress_message(1, 3), "33.33%");
}

#[test]
fn test_success_path_and_monitor_view() {
    let dir = TempDir::new().unwrap();
    let (job, mut ledger) = running(dir.path());

    let pending = JobStatus::load(dir.path(), &job.id).unwrap();
    assert_eq!(pending.state(), JobState::Running);
    assert_eq!(pending.status_code(), 0);
    assert_eq!(pending.inserts().unwrap(), 0);

    ledger.warning("Chunk 1: dropped 1 row(s) failing required fields (DT_NOTIFIC: 1)").unwrap();
    ledger.progress(150, 100).unwrap();
    ledger.seal_indexes(&[3, 5, 8], &[1]).unwrap();
    ledger.done(3, 1.5).unwrap();

    let status = JobStatus::load(dir.path(), &job.id).unwrap();
    assert_eq!(status.status_code(), 1);
    assert_eq!(status.inserts().unwrap(), 3);
    assert_eq!(status.updates().unwrap(), 1);
    assert_eq!(status.time_spend().unwrap(), Some(1.5));

    let progress = status.read_logs(LogLevel::Progress, true).unwrap();
    assert_eq!(progress[0].message, "100.00%");

    let at_least_warning = status.read_logs(LogLevel::Warning, false).unwrap();
    let levels: Vec<LogLevel> = at_least_warning.iter().map(|l| l.level).collect();
    assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Success]);
    assert_eq!(
        at_least_warning[1].message,
        "CHIKBR23.parquet: 3 inserts in 1.50 seconds."
    );

    let raw = std::fs::read_to_string(&status.paths().log).unwrap();
    assert!(raw.contains("SUCCESS - CHIKBR23.parquet"));
    assert!(raw.contains("WARNING - Chunk 1"));
}

#[test]
fn test_terminal_states_reject_writes() {
    let dir = TempDir::new().unwrap();
    let (_, mut ledger) = running(dir.path());
    ledger.fatal("Database error: connection reset").unwrap();
    assert_eq!(ledger.state(), JobState::Error);

    assert!(matches!(ledger.info("late"), Err(IngestError::LedgerClosed { .. })));
    assert!(matches!(ledger.done(0, 0.1), Err(IngestError::LedgerClosed { .. })));
    assert!(matches!(ledger.fatal("again"), Err(IngestError::LedgerClosed { .. })));
    assert!(ledger.seal_indexes(&[1], &[]).is_err());
}

#[test]
fn test_pending_cannot_finish() {
    let dir = TempDir::new().unwrap();
    let job = job();
    let mut ledger = JobLedger::create(dir.path(), &job).unwrap();

    assert!(matches!(ledger.done(0, 0.0), Err(IngestError::InvalidTransition { .. })));
    assert!(matches!(ledger.fatal("x"), Err(IngestError::InvalidTransition { .. })));
    ledger.start().unwrap();
    assert!(matches!(ledger.start(), Err(IngestError::InvalidTransition { .. })));
}

#[test]
fn test_indexes_written_once() {
    let dir = TempDir::new().unwrap();
    let (_, mut ledger) = running(dir.path());
    ledger.seal_indexes(&[1], &[]).unwrap();
    assert!(ledger.seal_indexes(&[1], &[]).is_err());
}

#[test]
fn test_chunked_ids_reproduce_sequence() {
    let dir = TempDir::new().unwrap();
    let (job, mut ledger) = running(dir.path());
    let ids: Vec<i64> = (0..23).map(|i| 1_000 + i * 3).collect();
    ledger.seal_indexes(&ids, &[]).unwrap();
    ledger.done(ids.len() as u64, 0.2).unwrap();

    let status = JobStatus::load(dir.path(), &job.id).unwrap();
    for chunk_size in [1, 7, ids.len()] {
        let chunks: Vec<Vec<i64>> = status
            .inserts_ids(chunk_size)
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert!(chunks.iter().all(|c| c.len() <= chunk_size));
        let joined: Vec<i64> = chunks.into_iter().flatten().collect();
        assert_eq!(joined, ids, "chunk size {chunk_size}");
    }
    assert_eq!(status.updates_ids(5).unwrap().count(), 0);
}

#[test]
fn test_recover_seals_running_jobs_only() {
    let dir = TempDir::new().unwrap();
    let (running_job, ledger) = running(dir.path());
    drop(ledger);
    let pending_job = job();
    JobLedger::create(dir.path(), &pending_job).unwrap();

    let recovered = recover_interrupted(dir.path()).unwrap();
    assert_eq!(recovered, vec![running_job.id]);

    let status = JobStatus::load(dir.path(), &running_job.id).unwrap();
    assert_eq!(status.status_code(), 2);
    assert!(status.first_error().unwrap().unwrap().contains("interrupted"));
    assert_eq!(
        JobStatus::load(dir.path(), &pending_job.id).unwrap().state(),
        JobState::Pending
    );
}

#[test]
fn test_unknown_job() {
    let dir = TempDir::new().unwrap();
    assert!(JobStatus::load(dir.path(), &job().id).is_err());
}
