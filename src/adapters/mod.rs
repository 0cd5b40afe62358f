//! External system integrations for sinan-ingest.
//!
//! - [`database`] - Destination abstraction (trait-based) and the in-memory store
//! - [`postgresql`] - PostgreSQL implementation
//!
//! # Design Pattern
//!
//! Adapters isolate the database behind [`database::NotificationStore`], so
//! the pipeline can be exercised against [`database::MemoryStore`] in tests
//! and dry runs.
//!
//! ```rust
//! use sinan_ingest::adapters::database::{MemoryStore, NotificationStore};
//! use sinan_ingest::domain::JobId;
//!
//! # async fn example() -> sinan_ingest::domain::Result<()> {
//! let store = MemoryStore::new();
//! let session = store.begin_staging(&JobId::new()).await?;
//! let affected = session.commit().await?;
//! assert!(affected.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod postgresql;
