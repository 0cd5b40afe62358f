//! Source file verification
//!
//! Runs before any row is read: the file must exist, be a regular file with a
//! supported extension, and its SHA-256 digest is computed for the ledger.

pub mod checksum;
pub mod verify;

pub use checksum::file_checksum;
pub use verify::{verify_source, SourceCheck};
