//! Domain error types
//!
//! This module defines the error hierarchy for sinan-ingest.
//! Third-party error types are converted into domain variants at the boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Main ingestion error type
///
/// Every variant except [`IngestError::LedgerClosed`] and
/// [`IngestError::InvalidTransition`] is a job-terminating cause when it
/// escapes the pipeline. Row-level problems never surface as errors.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source file errors (missing, unsupported, corrupt)
    #[error("Source file error: {0}")]
    Source(#[from] SourceError),

    /// Required columns absent from the data file with no usable synonym
    #[error("Required field(s) not found in data file: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Write attempted on a ledger in a terminal state
    #[error("Ledger for job {job_id} is closed for writing (status: {status})")]
    LedgerClosed { job_id: String, status: String },

    /// State machine transition that is not allowed
    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Ledger artifact errors (bad index file, missing manifest)
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised while opening or streaming a source file
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Extension does not map to a supported reader
    #[error("Unsupported file extension: '{0}' (expected .csv, .dbf or .parquet)")]
    UnsupportedExtension(String),

    /// File content does not match its declared format
    #[error("Corrupt file {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// File ended before the declared content
    #[error("Truncated file {}: {message}", path.display())]
    Truncated { path: PathBuf, message: String },

    /// CSV decoding errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// Parquet decoding errors
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// Underlying I/O failure while reading
    #[error("Read error: {0}")]
    Io(String),
}

impl IngestError {
    /// Whether this error means the pipeline kept writing past a terminal state
    pub fn is_ledger_closed(&self) -> bool {
        matches!(self, IngestError::LedgerClosed { .. })
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for IngestError {
    fn from(err: toml::de::Error) -> Self {
        IngestError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for IngestError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            IngestError::Connection(err.to_string())
        } else {
            match err.as_db_error() {
                Some(db) => IngestError::Database(format!("{} ({})", db.message(), db.code().code())),
                None => IngestError::Database(err.to_string()),
            }
        }
    }
}

impl From<deadpool_postgres::PoolError> for IngestError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        IngestError::Connection(format!("Failed to get connection from pool: {err}"))
    }
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        SourceError::Csv(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for SourceError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        SourceError::Parquet(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_display() {
        let err = IngestError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_missing_fields_lists_every_field() {
        let err = IngestError::MissingFields(vec!["DT_NOTIFIC".to_string(), "CS_SEXO".to_string()]);
        assert_eq!(
            err.to_string(),
            "Required field(s) not found in data file: DT_NOTIFIC, CS_SEXO"
        );
    }

    #[test]
    fn test_source_error_conversion() {
        let source = SourceError::UnsupportedExtension("xlsx".to_string());
        let err: IngestError = source.into();
        assert!(matches!(err, IngestError::Source(_)));
        assert!(err.to_string().contains(".xlsx") || err.to_string().contains("'xlsx'"));
    }

    #[test]
    fn test_ledger_closed_detection() {
        let err = IngestError::LedgerClosed {
            job_id: "abc".to_string(),
            status: "success".to_string(),
        };
        assert!(err.is_ledger_closed());
        assert!(!IngestError::Other("x".to_string()).is_ledger_closed());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: IngestError = io_err.into();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: IngestError = json_err.into();
        assert!(matches!(err, IngestError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: IngestError = toml_err.into();
        assert!(matches!(err, IngestError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_ingest_error_implements_std_error() {
        let err = IngestError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
