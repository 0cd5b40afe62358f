//! Context extension for domain results
//!
//! [`ResultExt`] prefixes an error message with what was being attempted,
//! keeping the [`IngestError`] variant so callers can still match on it.
//!
//! ```rust
//! use sinan_ingest::domain::context::ResultExt;
//! use sinan_ingest::domain::Result;
//!
//! fn read_manifest(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))
//! }
//! ```

use std::fmt::Display;

use crate::domain::errors::IngestError;
use crate::domain::result::Result;

pub trait ResultExt<T> {
    /// Prefixes the error with `context`
    fn context<C: Display>(self, context: C) -> Result<T>;

    /// Like [`ResultExt::context`], computing the context only on error
    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<IngestError>,
{
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| wrap(e.into(), &context))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| wrap(e.into(), &f()))
    }
}

fn wrap(error: IngestError, context: &dyn Display) -> IngestError {
    let prefix = |msg: String| format!("{context}: {msg}");
    match error {
        IngestError::Configuration(m) => IngestError::Configuration(prefix(m)),
        IngestError::Database(m) => IngestError::Database(prefix(m)),
        IngestError::Connection(m) => IngestError::Connection(prefix(m)),
        IngestError::Ledger(m) => IngestError::Ledger(prefix(m)),
        IngestError::Validation(m) => IngestError::Validation(prefix(m)),
        IngestError::Serialization(m) => IngestError::Serialization(prefix(m)),
        IngestError::Io(m) => IngestError::Io(prefix(m)),
        IngestError::Other(m) => IngestError::Other(prefix(m)),
        // Structured variants carry their own message
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::SourceError;
    use std::path::PathBuf;

    #[test]
    fn test_context_keeps_variant() {
        let result: Result<()> = Err(IngestError::Ledger("bad header".to_string()));
        let err = result.context("Cannot open inserts index").unwrap_err();
        assert!(matches!(err, IngestError::Ledger(_)));
        assert_eq!(err.to_string(), "Ledger error: Cannot open inserts index: bad header");
    }

    #[test]
    fn test_with_context_from_io_error() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.with_context(|| format!("Cannot create {}", "/ledger")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
        assert!(err.to_string().contains("Cannot create /ledger: "));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_structured_errors_pass_through() {
        let result: Result<()> = Err(IngestError::MissingFields(vec!["CS_SEXO".to_string()]));
        let err = result.context("ignored").unwrap_err();
        assert_eq!(err.to_string(), "Required field(s) not found in data file: CS_SEXO");

        let result: Result<()> = Err(SourceError::NotFound(PathBuf::from("x.csv")).into());
        assert!(matches!(result.context("ignored"), Err(IngestError::Source(_))));
    }

    #[test]
    fn test_ok_untouched() {
        let result: Result<u8> = Ok(3);
        assert_eq!(result.context("unused").unwrap(), 3);
    }
}
