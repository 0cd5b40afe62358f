//! Checksum calculation for source files
//!
//! The digest is recorded in the ledger so an archived file can later be
//! matched to the job that ingested it.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::domain::{Result, SourceError};

const READ_BUFFER: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file, streaming its contents
///
/// Returns the lowercase hex digest (64 characters).
///
/// # Examples
///
/// ```
/// use sinan_ingest::core::verification::checksum::file_checksum;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("empty.csv");
/// std::fs::write(&path, b"")?;
/// assert_eq!(
///     file_checksum(&path)?,
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// # Ok(())
/// # }
/// ```
pub fn file_checksum(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(SourceError::from)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER, file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];

    loop {
        let n = reader.read(&mut buf).map_err(SourceError::from)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate SHA-256 checksum of raw bytes
pub fn checksum_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
