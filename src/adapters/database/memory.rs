//! In-memory destination
//!
//! Backs `--dry-run` and the test suite. Keys, ids and the insert/update
//! split behave like the PostgreSQL upsert; nothing survives the process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::traits::{AffectedRow, NotificationStore, StagingSession};
use crate::domain::{IngestError, JobId, NotificationRecord, Result, UniqueKey};

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<UniqueKey, (i64, NotificationRecord)>,
    next_id: i64,
    fail_next_commit: Option<String>,
}

/// Destination table held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail with a database error
    pub async fn fail_next_commit(&self, message: impl Into<String>) {
        self.table.lock().await.fail_next_commit = Some(message.into());
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, key: &UniqueKey) -> Option<(i64, NotificationRecord)> {
        self.table.lock().await.rows.get(key).cloned()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn begin_staging(&self, job_id: &JobId) -> Result<Box<dyn StagingSession>> {
        tracing::debug!(job_id = %job_id, "Opening in-memory staging area");
        Ok(Box::new(MemorySession {
            table: Arc::clone(&self.table),
            staged: HashMap::new(),
            order: Vec::new(),
        }))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

struct MemorySession {
    table: Arc<Mutex<Table>>,
    staged: HashMap<UniqueKey, NotificationRecord>,
    /// First-staged order of keys, so commit output is deterministic
    order: Vec<UniqueKey>,
}

#[async_trait]
impl StagingSession for MemorySession {
    async fn stage(&mut self, rows: &[NotificationRecord]) -> Result<u64> {
        for row in rows {
            let key = row.key();
            if self.staged.insert(key.clone(), row.clone()).is_none() {
                self.order.push(key);
            }
        }
        Ok(rows.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<Vec<AffectedRow>> {
        let MemorySession {
            table,
            mut staged,
            order,
        } = *self;
        let mut table = table.lock().await;
        if let Some(message) = table.fail_next_commit.take() {
            return Err(IngestError::Database(message));
        }

        let mut affected = Vec::with_capacity(order.len());
        for key in order {
            let Some(record) = staged.remove(&key) else {
                continue;
            };
            match table.rows.get_mut(&key) {
                Some((id, existing)) => {
                    *existing = record;
                    affected.push(AffectedRow { id: *id, inserted: false });
                }
                None => {
                    table.next_id += 1;
                    let id = table.next_id;
                    table.rows.insert(key, (id, record));
                    affected.push(AffectedRow { id, inserted: true });
                }
            }
        }
        Ok(affected)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
