//! Pre-ingestion checks on the accepted source file

use std::path::{Path, PathBuf};

use super::checksum::file_checksum;
use crate::core::source::SourceFormat;
use crate::domain::{Result, SourceError};

/// Facts established about a source file before it is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCheck {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Verifies that `path` is a readable regular file with a supported extension
///
/// The checksum is computed last so that cheap failures surface first.
pub fn verify_source(path: &Path) -> Result<SourceCheck> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::NotFound(path.to_path_buf()).into())
        }
        Err(e) => return Err(SourceError::from(e).into()),
    };
    if !metadata.is_file() {
        return Err(SourceError::Corrupt {
            path: path.to_path_buf(),
            message: "not a regular file".to_string(),
        }
        .into());
    }

    let format = SourceFormat::from_path(path)?;
    let sha256 = file_checksum(path)?;

    tracing::debug!(
        path = %path.display(),
        format = %format,
        size_bytes = metadata.len(),
        "Source file verified"
    );

    Ok(SourceCheck {
        path: path.to_path_buf(),
        format,
        size_bytes: metadata.len(),
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verify_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dengue.CSV");
        std::fs::write(&path, b"A\n1\n").unwrap();

        let check = verify_source(&path).unwrap();
        assert_eq!(check.format, SourceFormat::Csv);
        assert_eq!(check.size_bytes, 4);
        assert_eq!(check.sha256.len(), 64);
    }

    #[test]
    fn test_verify_missing() {
        let err = verify_source(Path::new("/nonexistent/dengue.csv")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_verify_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("folder.csv");
        std::fs::create_dir(&sub).unwrap();
        assert!(verify_source(&sub).is_err());
    }

    #[test]
    fn test_verify_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dengue.xlsx");
        std::fs::write(&path, b"x").unwrap();
        let err = verify_source(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
