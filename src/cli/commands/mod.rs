//! CLI command implementations
//!
//! Commands return the process exit code: 0 success, 1 at least one job
//! failed, 2 configuration or argument error, 4 database unreachable,
//! 5 fatal error.

pub mod ingest;
pub mod init;
pub mod recover;
pub mod status;
pub mod validate;
