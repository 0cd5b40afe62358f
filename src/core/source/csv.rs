//! Delimited text reader
//!
//! SINAN CSV exports come with either `,` or `;` separators and in UTF-8 or
//! Latin-1. The delimiter is sniffed from the header line and every field
//! is decoded as UTF-8 with a Latin-1 fallback.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ::csv::{ByteRecord, Reader, ReaderBuilder};

use super::{RawValue, RowSource};
use crate::domain::{Result, SourceError};

/// Streaming CSV source
pub struct CsvSource {
    path: PathBuf,
    reader: Reader<File>,
    headers: Vec<String>,
    total_rows: u64,
    record: ByteRecord,
}

impl CsvSource {
    pub fn open(path: &Path) -> Result<Self> {
        let delimiter = sniff_delimiter(path)?;
        let total_rows = count_records(path, delimiter)?;

        let mut reader = builder(delimiter)
            .from_path(path)
            .map_err(|e| corrupt(path, e))?;
        let headers = reader
            .byte_headers()
            .map_err(|e| corrupt(path, e))?
            .iter()
            .map(|h| decode(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            total_rows,
            record: ByteRecord::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for CsvSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn total_rows(&self) -> Option<u64> {
        Some(self.total_rows)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RawValue>>> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(|e| corrupt(&self.path, e))?;
        if !more {
            return Ok(None);
        }

        // Short rows are padded so indexes from the header always resolve
        let mut row: Vec<RawValue> = self.record.iter().map(|f| RawValue::text(&decode(f))).collect();
        row.resize(self.headers.len().max(row.len()), RawValue::Null);
        Ok(Some(row))
    }
}

fn builder(delimiter: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).delimiter(delimiter).flexible(true);
    builder
}

/// `;` when the header line has more semicolons than commas, else `,`
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let mut first_line = Vec::new();
    BufReader::new(File::open(path).map_err(SourceError::from)?)
        .read_until(b'\n', &mut first_line)
        .map_err(SourceError::from)?;

    let semicolons = first_line.iter().filter(|&&b| b == b';').count();
    let commas = first_line.iter().filter(|&&b| b == b',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

/// Counting pass so progress can be reported against a known total
fn count_records(path: &Path, delimiter: u8) -> Result<u64> {
    let mut reader = builder(delimiter).from_path(path).map_err(|e| corrupt(path, e))?;
    let mut record = ByteRecord::new();
    let mut count = 0u64;
    while reader.read_byte_record(&mut record).map_err(|e| corrupt(path, e))? {
        count += 1;
    }
    Ok(count)
}

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to one code point)
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn corrupt(path: &Path, err: ::csv::Error) -> SourceError {
    if let ::csv::ErrorKind::Io(io) = err.kind() {
        return SourceError::Io(format!("{}: {}", path.display(), io));
    }
    SourceError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
