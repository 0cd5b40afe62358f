//! dBase III table reader
//!
//! SINAN distributes its national exports as `.dbf` tables. Text is Latin-1.
//!
//! # File header (32 bytes)
//!
//! | Offset | Size | Field                              |
//! |--------|------|------------------------------------|
//! | 0      | 1    | version                            |
//! | 1-3    | 3    | last update (YY MM DD)             |
//! | 4-7    | 4    | record count (u32 LE)              |
//! | 8-9    | 2    | header length incl. fields (u16 LE)|
//! | 10-11  | 2    | record length (u16 LE)             |
//! | 12-31  | 20   | reserved                           |
//!
//! # Field descriptor (32 bytes each, list ends with 0x0D)
//!
//! | Offset | Size | Field                   |
//! |--------|------|-------------------------|
//! | 0-10   | 11   | name, NUL padded        |
//! | 11     | 1    | type (C, N, F, D, L...) |
//! | 16     | 1    | length                  |
//! | 17     | 1    | decimal count           |
//!
//! Records follow at the header length: one deletion flag byte (`*` when
//! deleted) and the fixed-width field values.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use super::{RawValue, RowSource};
use crate::domain::{Result, SourceError};

const FILE_HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const END_OF_FILE: u8 = 0x1A;
const DELETED: u8 = b'*';

/// One column of a DBF table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    pub kind: u8,
    pub length: usize,
    pub decimals: u8,
}

/// Streaming DBF source
pub struct DbfSource {
    path: PathBuf,
    reader: BufReader<File>,
    fields: Vec<DbfField>,
    headers: Vec<String>,
    record_count: u64,
    record_len: usize,
    records_read: u64,
    buf: Vec<u8>,
}

impl DbfSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(SourceError::from)?;
        let mut reader = BufReader::new(file);

        let mut header = [0u8; FILE_HEADER_LEN];
        read_exact(&mut reader, &mut header, path, "file header")?;

        let record_count = u64::from(read_u32(&header, 4));
        let header_len = usize::from(read_u16(&header, 8));
        let record_len = usize::from(read_u16(&header, 10));

        if header_len < FILE_HEADER_LEN + 1 {
            return Err(corrupt(path, format!("header length {header_len} is too small")));
        }

        let mut descriptors = vec![0u8; header_len - FILE_HEADER_LEN];
        read_exact(&mut reader, &mut descriptors, path, "field descriptors")?;
        let fields = parse_descriptors(&descriptors, path)?;

        let data_len: usize = fields.iter().map(|f| f.length).sum();
        if data_len + 1 != record_len {
            return Err(corrupt(
                path,
                format!("record length {record_len} does not match field widths {}", data_len + 1),
            ));
        }

        let headers = fields.iter().map(|f| f.name.clone()).collect();
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            fields,
            headers,
            record_count,
            record_len,
            records_read: 0,
            buf: vec![0u8; record_len],
        })
    }

    pub fn fields(&self) -> &[DbfField] {
        &self.fields
    }

    fn decode_record(&self) -> Vec<RawValue> {
        let mut offset = 1;
        self.fields
            .iter()
            .map(|field| {
                let bytes = &self.buf[offset..offset + field.length];
                offset += field.length;
                decode_value(field, bytes)
            })
            .collect()
    }
}

impl RowSource for DbfSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn total_rows(&self) -> Option<u64> {
        Some(self.record_count)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RawValue>>> {
        loop {
            if self.records_read >= self.record_count {
                return Ok(None);
            }

            let what = format!("record {} of {}", self.records_read + 1, self.record_count);
            let mut buf = std::mem::take(&mut self.buf);
            let read = read_exact(&mut self.reader, &mut buf, &self.path, &what);
            self.buf = buf;
            read?;
            self.records_read += 1;

            match self.buf[0] {
                DELETED => continue,
                END_OF_FILE => {
                    return Err(SourceError::Truncated {
                        path: self.path.clone(),
                        message: format!("end-of-file marker at {what}"),
                    }
                    .into())
                }
                _ => return Ok(Some(self.decode_record())),
            }
        }
    }
}

fn parse_descriptors(bytes: &[u8], path: &Path) -> Result<Vec<DbfField>> {
    let mut fields = Vec::new();
    let mut offset = 0;
    loop {
        match bytes.get(offset) {
            None => return Err(corrupt(path, "field descriptor terminator not found".to_string())),
            Some(&HEADER_TERMINATOR) => break,
            Some(_) => {}
        }
        let Some(desc) = bytes.get(offset..offset + DESCRIPTOR_LEN) else {
            return Err(corrupt(path, format!("field descriptor {} is incomplete", fields.len() + 1)));
        };

        let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = latin1(&desc[..name_end]).trim().to_string();
        let length = usize::from(desc[16]);
        if name.is_empty() || length == 0 {
            return Err(corrupt(path, format!("field descriptor {} is invalid", fields.len() + 1)));
        }

        fields.push(DbfField {
            name,
            kind: desc[11].to_ascii_uppercase(),
            length,
            decimals: desc[17],
        });
        offset += DESCRIPTOR_LEN;
    }

    if fields.is_empty() {
        return Err(corrupt(path, "table declares no fields".to_string()));
    }
    Ok(fields)
}

fn decode_value(field: &DbfField, bytes: &[u8]) -> RawValue {
    let text = latin1(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return RawValue::Null;
    }

    match field.kind {
        b'N' | b'F' => {
            if field.decimals == 0 {
                if let Ok(v) = trimmed.parse::<i64>() {
                    return RawValue::Int(v);
                }
            }
            trimmed
                .parse::<f64>()
                .map(RawValue::Float)
                .unwrap_or_else(|_| RawValue::Text(trimmed.to_string()))
        }
        b'D' => {
            if trimmed.bytes().all(|b| b == b'0') {
                return RawValue::Null;
            }
            NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                .map(RawValue::Date)
                .unwrap_or_else(|_| RawValue::Text(trimmed.to_string()))
        }
        b'L' => match trimmed.as_bytes()[0] {
            b'T' | b't' | b'Y' | b'y' => RawValue::Bool(true),
            b'F' | b'f' | b'N' | b'n' => RawValue::Bool(false),
            _ => RawValue::Null,
        },
        _ => RawValue::Text(trimmed.to_string()),
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8], path: &Path, what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            SourceError::Truncated {
                path: path.to_path_buf(),
                message: format!("file ends inside {what}"),
            }
        } else {
            SourceError::Io(format!("{}: {}", path.display(), e))
        }
    })?;
    Ok(())
}

fn corrupt(path: &Path, message: String) -> crate::domain::IngestError {
    SourceError::Corrupt {
        path: path.to_path_buf(),
        message,
    }
    .into()
}
