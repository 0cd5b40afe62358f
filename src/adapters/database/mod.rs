//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over the destination so the
//! pipeline runs unchanged against PostgreSQL or the in-memory store.

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::create_store;
pub use memory::MemoryStore;
pub use traits::{AffectedRow, NotificationStore, StagingSession};
