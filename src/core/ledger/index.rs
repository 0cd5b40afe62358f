//! Id index files
//!
//! Each finished job leaves two of these: the destination ids it inserted
//! and the ids it updated. They are written exactly once, at completion.
//!
//! # Layout (version 1, little-endian)
//!
//! | Offset | Size    | Field                         |
//! |--------|---------|-------------------------------|
//! | 0      | 4       | magic `SIDX`                  |
//! | 4      | 2       | format version                |
//! | 6      | 2       | reserved, zero                |
//! | 8      | 8       | id count `n` (u64)            |
//! | 16     | 8 * `n` | ids (i64), in recorded order  |

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::domain::{IngestError, Result};

pub const INDEX_MAGIC: &[u8; 4] = b"SIDX";
pub const INDEX_VERSION: u16 = 1;
const HEADER_LEN: u64 = 16;
const ID_LEN: u64 = 8;

/// Writes `ids` to `path` atomically
///
/// The content goes to a sibling temporary file that is synced and then
/// renamed over `path`, so readers see either no file or the whole file.
/// An existing index is never overwritten.
pub fn write_index(path: &Path, ids: &[i64]) -> Result<()> {
    if path.exists() {
        return Err(IngestError::Ledger(format!(
            "Index {} already exists and is written only once",
            path.display()
        )));
    }

    let tmp = temp_path(path);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(INDEX_MAGIC)?;
    writer.write_all(&INDEX_VERSION.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&(ids.len() as u64).to_le_bytes())?;
    for id in ids {
        writer.write_all(&id.to_le_bytes())?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| IngestError::Io(format!("Failed to flush {}: {}", tmp.display(), e)))?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Number of ids in an index, zero when the file does not exist
pub fn index_count(path: &Path) -> Result<u64> {
    match IndexReader::open(path) {
        Ok(reader) => Ok(reader.len()),
        Err(IngestError::Io(_)) if !path.exists() => Ok(0),
        Err(e) => Err(e),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Sequential reader over an index file
#[derive(Debug)]
pub struct IndexReader {
    path: PathBuf,
    reader: BufReader<File>,
    count: u64,
    remaining: u64,
}

impl IndexReader {
    /// Opens an index and validates its header against the file length
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let actual_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header).map_err(|e| corrupt(path, &format!("short header: {e}")))?;

        if &header[0..4] != INDEX_MAGIC {
            return Err(corrupt(path, "bad magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != INDEX_VERSION {
            return Err(corrupt(path, &format!("unsupported version {version}")));
        }
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[8..16]);
        let count = u64::from_le_bytes(count_bytes);

        let expected_len = count
            .checked_mul(ID_LEN)
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| corrupt(path, "id count overflows"))?;
        if expected_len != actual_len {
            return Err(corrupt(
                path,
                &format!("header declares {count} ids but file holds {actual_len} bytes"),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            count,
            remaining: count,
        })
    }

    /// Total number of ids in the file
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reads up to `chunk_size` ids; `None` once the file is exhausted
    pub fn read_chunk(&mut self, chunk_size: usize) -> Result<Option<Vec<i64>>> {
        if chunk_size == 0 {
            return Err(IngestError::Validation("chunk size must be > 0".to_string()));
        }
        if self.remaining == 0 {
            return Ok(None);
        }

        let take = self.remaining.min(chunk_size as u64) as usize;
        let mut buf = vec![0u8; take * ID_LEN as usize];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| corrupt(&self.path, &format!("short read: {e}")))?;
        self.remaining -= take as u64;

        Ok(Some(
            buf.chunks_exact(ID_LEN as usize)
                .map(|b| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(b);
                    i64::from_le_bytes(bytes)
                })
                .collect(),
        ))
    }

    /// Iterator over fixed-size chunks
    pub fn chunks(self, chunk_size: usize) -> IdChunks {
        IdChunks {
            reader: Some(self),
            chunk_size,
        }
    }

    /// Reads every remaining id
    pub fn read_all(mut self) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(self.remaining as usize);
        while let Some(chunk) = self.read_chunk(4096)? {
            ids.extend(chunk);
        }
        Ok(ids)
    }
}

/// Chunked id iterator used for paged display
///
/// Stops after the first error.
#[derive(Debug)]
pub struct IdChunks {
    reader: Option<IndexReader>,
    chunk_size: usize,
}

impl IdChunks {
    /// Iterator over a missing index: yields nothing
    pub fn empty(chunk_size: usize) -> Self {
        Self {
            reader: None,
            chunk_size,
        }
    }
}

impl Iterator for IdChunks {
    type Item = Result<Vec<i64>>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match reader.read_chunk(self.chunk_size) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.reader = None;
                None
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}

fn corrupt(path: &Path, message: &str) -> IngestError {
    IngestError::Ledger(format!("Corrupt index {}: {}", path.display(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.inserts.ids");
        let ids = vec![5, 3, 900_000_000_001, -1];

        write_index(&path, &ids).unwrap();
        assert_eq!(index_count(&path).unwrap(), 4);
        assert_eq!(IndexReader::open(&path).unwrap().read_all().unwrap(), ids);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_header_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.updates.ids");
        write_index(&path, &[7]).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"SIDX");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1);
        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes[16], 7);
    }

    #[test]
    fn test_written_only_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.inserts.ids");
        write_index(&path, &[1]).unwrap();
        assert!(matches!(write_index(&path, &[2]), Err(IngestError::Ledger(_))));
        assert_eq!(IndexReader::open(&path).unwrap().read_all().unwrap(), vec![1]);
    }

    #[test]
    fn test_missing_index_counts_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(index_count(&dir.path().join("absent.ids")).unwrap(), 0);
    }

    #[test]
    fn test_truncated_index_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.inserts.ids");
        write_index(&path, &[1, 2, 3]).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(IndexReader::open(&path), Err(IngestError::Ledger(_))));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.inserts.ids");
        fs::write(&path, [0u8; 16]).unwrap();
        assert!(IndexReader::open(&path).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.inserts.ids");
        write_index(&path, &[1]).unwrap();
        let mut reader = IndexReader::open(&path).unwrap();
        assert!(reader.read_chunk(0).is_err());
    }

    #[test]
    fn test_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.updates.ids");
        write_index(&path, &[]).unwrap();
        let reader = IndexReader::open(&path).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.chunks(3).count(), 0);
    }
}
