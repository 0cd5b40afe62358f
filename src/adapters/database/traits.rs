//! Database abstraction traits
//!
//! This module defines the traits a destination backend must implement to
//! receive notification records.

use async_trait::async_trait;

use crate::domain::{JobId, NotificationRecord, Result};

/// One destination row touched by the final upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffectedRow {
    /// Destination surrogate identifier
    pub id: i64,

    /// `true` when the row did not exist before the upsert
    pub inserted: bool,
}

/// Destination store for parsed notifications
///
/// Each job stages its rows through a [`StagingSession`] opened with
/// [`NotificationStore::begin_staging`]; nothing reaches the destination
/// until that session commits.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Test the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Ensure the destination schema, table and uniqueness constraint exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<()>;

    /// Open a job-scoped staging area inside a fresh transaction
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or the staging
    /// table cannot be created.
    async fn begin_staging(&self, job_id: &JobId) -> Result<Box<dyn StagingSession>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &str;
}

/// Transaction-scoped staging area for one job
///
/// Staging the same key twice keeps the row staged last. Dropping a session
/// without calling [`StagingSession::commit`] discards everything staged.
#[async_trait]
pub trait StagingSession: Send {
    /// Append rows, replacing already-staged rows with the same key
    ///
    /// Returns the number of rows written to the staging area.
    ///
    /// # Errors
    ///
    /// Any error leaves the session unusable; the caller must roll back.
    async fn stage(&mut self, rows: &[NotificationRecord]) -> Result<u64>;

    /// Merge every staged row into the destination in one statement and commit
    ///
    /// Returns one entry per affected destination row. On error nothing is
    /// committed.
    async fn commit(self: Box<Self>) -> Result<Vec<AffectedRow>>;

    /// Discard all staged rows
    async fn rollback(self: Box<Self>) -> Result<()>;
}
