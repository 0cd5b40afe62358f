//! PostgreSQL database integration
//!
//! This module provides the PostgreSQL destination: a pooled client, the SQL
//! text for staging and upserting, and the [`NotificationStore`] adapter.
//!
//! [`NotificationStore`]: crate::adapters::database::NotificationStore

pub mod adapter;
pub mod client;
pub mod sql;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
