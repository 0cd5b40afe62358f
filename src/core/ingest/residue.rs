//! Residue file of dropped rows
//!
//! Rows excluded by the parser are written as CSV next to the ledger, with
//! their source row number and the reason, followed by the raw values under
//! the file's original headers. The file is only created once a row is
//! actually dropped. Ragged source rows keep their width, so records may be
//! longer or shorter than the header.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::core::parse::DroppedRow;
use crate::domain::{IngestError, Result};

pub struct ResidueWriter {
    path: PathBuf,
    headers: Vec<String>,
    writer: Option<Writer<File>>,
    rows: u64,
}

impl ResidueWriter {
    pub fn new(path: impl Into<PathBuf>, headers: &[String]) -> Self {
        Self {
            path: path.into(),
            headers: headers.to_vec(),
            writer: None,
            rows: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write(&mut self, dropped: &[DroppedRow]) -> Result<()> {
        if dropped.is_empty() {
            return Ok(());
        }
        let path = self.path.clone();
        let writer = match self.writer.as_mut() {
            Some(w) => w,
            None => {
                let mut w = WriterBuilder::new()
                    .flexible(true)
                    .from_path(&path)
                    .map_err(|e| residue_error(&path, e))?;
                let mut header = vec!["row".to_string(), "reason".to_string()];
                header.extend(self.headers.iter().cloned());
                w.write_record(&header).map_err(|e| residue_error(&path, e))?;
                self.writer.insert(w)
            }
        };

        for row in dropped {
            let mut record = vec![row.row.to_string(), row.reason.clone()];
            record.extend(row.values.iter().map(|v| v.to_string()));
            writer.write_record(&record).map_err(|e| residue_error(&path, e))?;
        }
        self.rows += dropped.len() as u64;
        Ok(())
    }

    /// Flushes buffered rows; returns whether a residue file exists
    pub fn finish(&mut self) -> Result<bool> {
        match self.writer.as_mut() {
            Some(w) => {
                w.flush()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn residue_error(path: &Path, err: csv::Error) -> IngestError {
    IngestError::Ledger(format!("Cannot write residue file {}: {}", path.display(), err))
}
