//! PostgreSQL adapter implementing the store traits
//!
//! A staging session holds one pooled connection with an open transaction
//! for the whole job. Rows go into a temporary table created `ON COMMIT
//! DROP`; the commit is a single `INSERT ... SELECT ... ON CONFLICT`
//! against the destination's named uniqueness constraint.

use async_trait::async_trait;
use deadpool_postgres::Object;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

use crate::adapters::database::traits::{AffectedRow, NotificationStore, StagingSession};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::sql;
use crate::domain::{IngestError, JobId, NotificationRecord, Result};

/// PostgreSQL implementation of [`NotificationStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    rows_per_statement: usize,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient, rows_per_statement: usize) -> Self {
        Self::new_with_arc(Arc::new(client), rows_per_statement)
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>, rows_per_statement: usize) -> Self {
        Self {
            client,
            rows_per_statement: rows_per_statement.max(1),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl NotificationStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn begin_staging(&self, job_id: &JobId) -> Result<Box<dyn StagingSession>> {
        let conn = self.client.get_connection().await?;
        conn.batch_execute("BEGIN").await?;

        let mut session = PgStagingSession {
            conn: Some(conn),
            job_id: *job_id,
            upsert: sql::upsert_from_staging(self.client.destination()),
            rows_per_statement: self.rows_per_statement,
        };

        let ddl = sql::create_staging(self.client.destination());
        let created = session.conn()?.batch_execute(&ddl).await;
        if let Err(e) = created {
            session.abort().await;
            return Err(e.into());
        }

        tracing::debug!(job_id = %job_id, "Staging table created");
        Ok(Box::new(session))
    }

    fn backend_name(&self) -> &str {
        "postgresql"
    }
}

struct PgStagingSession {
    /// `None` once the transaction has ended
    conn: Option<Object>,
    job_id: JobId,
    upsert: String,
    rows_per_statement: usize,
}

impl PgStagingSession {
    fn conn(&self) -> Result<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            IngestError::Database(format!("Staging transaction for job {} already ended", self.job_id))
        })
    }

    /// Best-effort rollback; a connection that cannot roll back is discarded
    async fn abort(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.batch_execute("ROLLBACK").await {
                tracing::warn!(job_id = %self.job_id, error = %e, "Rollback failed, discarding connection");
                let _ = Object::take(conn);
            }
        }
    }
}

impl Drop for PgStagingSession {
    fn drop(&mut self) {
        // An open transaction must never go back to the pool
        if let Some(conn) = self.conn.take() {
            let _ = Object::take(conn);
        }
    }
}

#[async_trait]
impl StagingSession for PgStagingSession {
    async fn stage(&mut self, rows: &[NotificationRecord]) -> Result<u64> {
        let mut written = 0;
        for chunk in rows.chunks(self.rows_per_statement) {
            let statement = sql::stage_rows(chunk.len());
            let params: Vec<&(dyn ToSql + Sync)> =
                chunk.iter().flat_map(sql::record_params).collect();

            let conn = self.conn()?;
            let prepared = conn.prepare_cached(&statement).await?;
            written += conn.execute(&prepared, &params).await?;
        }
        Ok(written)
    }

    async fn commit(mut self: Box<Self>) -> Result<Vec<AffectedRow>> {
        let result = async {
            let conn = self.conn()?;
            let rows = conn.query(self.upsert.as_str(), &[]).await?;
            let affected = rows
                .iter()
                .map(|row| {
                    Ok(AffectedRow {
                        id: row.try_get(0)?,
                        inserted: row.try_get(1)?,
                    })
                })
                .collect::<std::result::Result<Vec<_>, tokio_postgres::Error>>()?;
            conn.batch_execute("COMMIT").await?;
            Ok::<_, IngestError>(affected)
        }
        .await;

        match result {
            Ok(affected) => {
                // Committed: the connection can go back to the pool
                drop(self.conn.take());
                Ok(affected)
            }
            Err(e) => {
                self.abort().await;
                Err(e)
            }
        }
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.abort().await;
        Ok(())
    }
}
