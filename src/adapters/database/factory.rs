//! Destination store factory
//!
//! Picks the backend from configuration: the in-memory store for dry runs,
//! PostgreSQL otherwise.

use std::sync::Arc;

use crate::adapters::database::memory::MemoryStore;
use crate::adapters::database::traits::NotificationStore;
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::IngestConfig;
use crate::domain::{IngestError, Result};

/// Create the destination store described by `config`
///
/// # Errors
///
/// Returns an error if PostgreSQL is required but not configured, or its
/// client cannot be created.
pub fn create_store(config: &IngestConfig) -> Result<Arc<dyn NotificationStore>> {
    if config.application.dry_run {
        tracing::info!("DRY RUN: notifications are kept in memory and discarded on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pg_config = config.postgresql.as_ref().ok_or_else(|| {
        IngestError::Configuration("[postgresql] section is required unless dry_run is set".to_string())
    })?;

    tracing::info!("Creating PostgreSQL client");
    let client = PostgreSQLClient::new(pg_config, config.destination.clone())?;
    Ok(Arc::new(PostgreSQLAdapter::new(client, config.ingest.rows_per_statement)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_dry_run_uses_memory() {
        let config = parse_config("[application]\ndry_run = true\n").unwrap();
        let store = create_store(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_postgresql_selected() {
        let config = parse_config(
            "[postgresql]\nconnection_string = \"postgresql://u:p@localhost:5432/sinan\"\n",
        )
        .unwrap();
        let store = create_store(&config).unwrap();
        assert_eq!(store.backend_name(), "postgresql");
    }
}
