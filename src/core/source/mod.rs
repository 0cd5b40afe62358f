//! Chunked source readers
//!
//! A [`SourceReader`] opens a `.csv`, `.dbf` or `.parquet` file and yields
//! [`RawBatch`]es of at most `chunk_size` rows without loading the file into
//! memory. The format is chosen once from the extension; each format has its
//! own [`RowSource`] implementation.

pub mod csv;
pub mod dbf;
pub mod parquet;

use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::domain::{Result, SourceError};

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Dbf,
    Parquet,
}

impl SourceFormat {
    /// Picks the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> std::result::Result<Self, SourceError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "dbf" => Ok(SourceFormat::Dbf),
            "parquet" => Ok(SourceFormat::Parquet),
            _ => Err(SourceError::UnsupportedExtension(ext)),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Dbf => "dbf",
            SourceFormat::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// A raw cell as read from the file, before coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Text cell, or `Null` when blank
    pub fn text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            RawValue::Null
        } else {
            RawValue::Text(trimmed.to_string())
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            RawValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Bounded slice of source rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    /// Zero-based chunk number
    pub index: usize,
    /// Zero-based position of the first row in the file
    pub first_row: u64,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row-at-a-time access to one source format
pub trait RowSource: Send {
    /// Column headers in file order
    fn headers(&self) -> &[String];

    /// Number of data rows, when known up front
    fn total_rows(&self) -> Option<u64>;

    /// Next row aligned with [`RowSource::headers`], `None` at end of file
    fn next_row(&mut self) -> Result<Option<Vec<RawValue>>>;
}

/// Source file reader with one handler per format
pub enum SourceReader {
    Csv(csv::CsvSource),
    Dbf(dbf::DbfSource),
    Parquet(parquet::ParquetSource),
}

/// Chunking wrapper over a [`SourceReader`]
pub struct ChunkReader {
    path: PathBuf,
    source: SourceReader,
    chunk_size: usize,
    next_index: usize,
    rows_read: u64,
    finished: bool,
}

impl SourceReader {
    /// Opens `path` with the handler its extension selects
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()).into());
        }
        Ok(match SourceFormat::from_path(path)? {
            SourceFormat::Csv => SourceReader::Csv(csv::CsvSource::open(path)?),
            SourceFormat::Dbf => SourceReader::Dbf(dbf::DbfSource::open(path)?),
            SourceFormat::Parquet => SourceReader::Parquet(parquet::ParquetSource::open(path)?),
        })
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            SourceReader::Csv(_) => SourceFormat::Csv,
            SourceReader::Dbf(_) => SourceFormat::Dbf,
            SourceReader::Parquet(_) => SourceFormat::Parquet,
        }
    }

    fn inner(&self) -> &dyn RowSource {
        match self {
            SourceReader::Csv(s) => s,
            SourceReader::Dbf(s) => s,
            SourceReader::Parquet(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn RowSource {
        match self {
            SourceReader::Csv(s) => s,
            SourceReader::Dbf(s) => s,
            SourceReader::Parquet(s) => s,
        }
    }

    pub fn headers(&self) -> &[String] {
        self.inner().headers()
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.inner().total_rows()
    }

    /// Wraps this reader into batches of `chunk_size` rows
    pub fn into_chunks(self, path: &Path, chunk_size: usize) -> ChunkReader {
        ChunkReader {
            path: path.to_path_buf(),
            source: self,
            chunk_size: chunk_size.max(1),
            next_index: 0,
            rows_read: 0,
            finished: false,
        }
    }
}

impl ChunkReader {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        self.source.headers()
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.source.total_rows()
    }

    /// Next batch, `None` once the file is exhausted
    pub fn next_batch(&mut self) -> Result<Option<RawBatch>> {
        if self.finished {
            return Ok(None);
        }

        let mut rows = Vec::with_capacity(self.chunk_size.min(8192));
        while rows.len() < self.chunk_size {
            match self.source.inner_mut().next_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let batch = RawBatch {
            index: self.next_index,
            first_row: self.rows_read,
            rows,
        };
        self.next_index += 1;
        self.rows_read += batch.len() as u64;
        Ok(Some(batch))
    }

    /// Moves reading onto the blocking thread pool
    ///
    /// Batches arrive on the returned channel in file order; at most
    /// `buffer` of them wait unconsumed. Reading stops after the first error
    /// or when the receiver is dropped.
    pub fn spawn(mut self, buffer: usize) -> mpsc::Receiver<Result<RawBatch>> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::task::spawn_blocking(move || loop {
            match self.next_batch() {
                Ok(Some(batch)) => {
                    if tx.blocking_send(Ok(batch)).is_err() {
                        tracing::debug!(path = %self.path.display(), "Batch receiver dropped, stopping reader");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        });
        rx
    }
}

impl Iterator for ChunkReader {
    type Item = Result<RawBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.CSV")).unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("x/b.dbf")).unwrap(), SourceFormat::Dbf);
        assert_eq!(
            SourceFormat::from_path(Path::new("c.parquet")).unwrap(),
            SourceFormat::Parquet
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("d.xlsx")),
            Err(SourceError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
        assert!(SourceFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let err = SourceReader::open(Path::new("/nonexistent/file.csv")).err().unwrap();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_open_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.xlsx");
        fs::write(&path, b"whatever").unwrap();
        let err = SourceReader::open(&path).err().unwrap();
        assert!(err.to_string().contains("Unsupported file extension"));
    }

    #[test]
    fn test_chunking_sizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        let mut content = String::from("A,B\n");
        for i in 0..7 {
            content.push_str(&format!("{i},x\n"));
        }
        fs::write(&path, content).unwrap();

        let reader = SourceReader::open(&path).unwrap();
        assert_eq!(reader.total_rows(), Some(7));
        let batches: Vec<RawBatch> = reader
            .into_chunks(&path, 3)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(batches[2].index, 2);
        assert_eq!(batches[2].first_row, 6);
        assert_eq!(batches[2].rows[0][0], RawValue::Text("6".to_string()));
    }

    #[tokio::test]
    async fn test_spawned_reader_delivers_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        let mut content = String::from("A\n");
        for i in 0..10 {
            content.push_str(&format!("{i}\n"));
        }
        fs::write(&path, content).unwrap();

        let mut rx = SourceReader::open(&path).unwrap().into_chunks(&path, 4).spawn(1);
        let mut indexes = Vec::new();
        while let Some(batch) = rx.recv().await {
            indexes.push(batch.unwrap().index);
        }
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_raw_value_text_blank_is_null() {
        assert_eq!(RawValue::text("   "), RawValue::Null);
        assert_eq!(RawValue::text(" 12 "), RawValue::Text("12".to_string()));
    }
}
