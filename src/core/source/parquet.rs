//! Parquet reader
//!
//! Rows are decoded one row group at a time through the record API, so peak
//! memory follows the writer's row group size rather than the file size.

use chrono::{DateTime, NaiveDate};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use ::parquet::errors::ParquetError;
use ::parquet::file::reader::{FileReader, SerializedFileReader};
use ::parquet::record::Field as ParquetField;

use super::{RawValue, RowSource};
use crate::domain::{Result, SourceError};

/// Streaming Parquet source
pub struct ParquetSource {
    path: PathBuf,
    reader: SerializedFileReader<File>,
    headers: Vec<String>,
    total_rows: u64,
    next_group: usize,
    pending: VecDeque<Vec<RawValue>>,
}

impl ParquetSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(SourceError::from)?;
        let reader = SerializedFileReader::new(file).map_err(|e| corrupt(path, e))?;

        let metadata = reader.metadata().file_metadata();
        let headers = metadata
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let total_rows = u64::try_from(metadata.num_rows()).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            total_rows,
            next_group: 0,
            pending: VecDeque::new(),
        })
    }

    pub fn row_groups(&self) -> usize {
        self.reader.num_row_groups()
    }

    fn load_next_group(&mut self) -> Result<bool> {
        if self.next_group >= self.reader.num_row_groups() {
            return Ok(false);
        }

        let group = self
            .reader
            .get_row_group(self.next_group)
            .map_err(|e| corrupt(&self.path, e))?;
        let rows = group.get_row_iter(None).map_err(|e| corrupt(&self.path, e))?;
        for row in rows {
            let row = row.map_err(|e| corrupt(&self.path, e))?;
            self.pending
                .push_back(row.get_column_iter().map(|(_, field)| convert(field)).collect());
        }

        self.next_group += 1;
        Ok(true)
    }
}

impl RowSource for ParquetSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn total_rows(&self) -> Option<u64> {
        Some(self.total_rows)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RawValue>>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if !self.load_next_group()? {
                return Ok(None);
            }
        }
    }
}

fn convert(field: &ParquetField) -> RawValue {
    match field {
        ParquetField::Null => RawValue::Null,
        ParquetField::Bool(b) => RawValue::Bool(*b),
        ParquetField::Byte(v) => RawValue::Int(i64::from(*v)),
        ParquetField::Short(v) => RawValue::Int(i64::from(*v)),
        ParquetField::Int(v) => RawValue::Int(i64::from(*v)),
        ParquetField::Long(v) => RawValue::Int(*v),
        ParquetField::UByte(v) => RawValue::Int(i64::from(*v)),
        ParquetField::UShort(v) => RawValue::Int(i64::from(*v)),
        ParquetField::UInt(v) => RawValue::Int(i64::from(*v)),
        ParquetField::ULong(v) => i64::try_from(*v)
            .map(RawValue::Int)
            .unwrap_or_else(|_| RawValue::Text(v.to_string())),
        ParquetField::Float(v) => RawValue::Float(f64::from(*v)),
        ParquetField::Double(v) => RawValue::Float(*v),
        ParquetField::Str(s) => RawValue::text(s),
        ParquetField::Date(days) => epoch_day(i64::from(*days)),
        ParquetField::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map(|dt| RawValue::Date(dt.date_naive()))
            .unwrap_or(RawValue::Null),
        ParquetField::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map(|dt| RawValue::Date(dt.date_naive()))
            .unwrap_or(RawValue::Null),
        other => RawValue::text(&other.to_string()),
    }
}

fn epoch_day(days: i64) -> RawValue {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days)))
        .map(RawValue::Date)
        .unwrap_or(RawValue::Null)
}

fn corrupt(path: &Path, err: ParquetError) -> SourceError {
    match err {
        ParquetError::EOF(message) => SourceError::Truncated {
            path: path.to_path_buf(),
            message,
        },
        other => SourceError::Corrupt {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}
