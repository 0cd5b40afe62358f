//! Staging loader
//!
//! Feeds parsed batches into the job's [`StagingSession`], strictly one batch
//! at a time. Within a batch, rows sharing a key are collapsed to the last
//! one before they reach the session, which resolves collisions with rows
//! staged by earlier batches the same way.

use std::collections::HashMap;

use crate::adapters::database::StagingSession;
use crate::domain::{NotificationRecord, Result, UniqueKey};

/// Keeps the last occurrence of every key, in the order those rows appeared
pub fn dedupe_last_wins(rows: &[NotificationRecord]) -> Vec<&NotificationRecord> {
    let mut last: HashMap<UniqueKey, usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        last.insert(row.key(), i);
    }
    rows.iter()
        .enumerate()
        .filter(|(i, row)| last.get(&row.key()) == Some(i))
        .map(|(_, row)| row)
        .collect()
}

/// Writer of one job's staging area
pub struct StagingLoader {
    session: Box<dyn StagingSession>,
    batches: usize,
    rows_staged: u64,
    duplicates_in_batches: u64,
}

impl StagingLoader {
    pub fn new(session: Box<dyn StagingSession>) -> Self {
        Self {
            session,
            batches: 0,
            rows_staged: 0,
            duplicates_in_batches: 0,
        }
    }

    /// Stages one batch; returns the number of rows written
    pub async fn stage(&mut self, rows: &[NotificationRecord]) -> Result<u64> {
        self.batches += 1;
        if rows.is_empty() {
            return Ok(0);
        }

        let unique: Vec<NotificationRecord> = dedupe_last_wins(rows).into_iter().cloned().collect();
        self.duplicates_in_batches += (rows.len() - unique.len()) as u64;

        let written = self.session.stage(&unique).await?;
        self.rows_staged += written;
        Ok(written)
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn rows_staged(&self) -> u64 {
        self.rows_staged
    }

    /// Rows replaced by a later row with the same key inside the same batch
    pub fn duplicates_in_batches(&self) -> u64 {
        self.duplicates_in_batches
    }

    pub fn into_session(self) -> Box<dyn StagingSession> {
        self.session
    }

    /// Discards everything staged so far
    pub async fn rollback(self) -> Result<()> {
        self.session.rollback().await
    }
}
