//! Result type alias for sinan-ingest

use super::errors::IngestError;

/// Result type alias for ingestion operations
///
/// # Examples
///
/// ```
/// use sinan_ingest::domain::result::Result;
/// use sinan_ingest::domain::errors::IngestError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(IngestError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, IngestError>;
