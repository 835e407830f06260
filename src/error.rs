//! Custom error types for the reconciler
//!
//! Only storage, configuration and input-format failures are represented here.
//! Matching problems (no candidate, registry outages, invalid identifiers) are
//! data carried on the records themselves and never abort a run.

use std::path::Path;

use thiserror::Error;

/// The main error type for reconciler operations
#[derive(Error, Debug)]
pub enum ReconError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// Validation errors at the ingestion boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persistent storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Registry client could not be constructed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl ReconError {
    /// Storage error tied to a specific file
    pub fn storage(action: &str, path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
    }

    /// Check if this is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Result type alias for reconciler operations
pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let err = ReconError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_storage_error_names_the_file() {
        let err = ReconError::storage("write", &PathBuf::from("/tmp/cache.json"), "disk full");
        assert_eq!(
            err.to_string(),
            "Storage error: Failed to write /tmp/cache.json: disk full"
        );
        assert!(err.is_storage());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReconError = io_err.into();
        assert!(matches!(err, ReconError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ReconError = json_err.into();
        assert!(matches!(err, ReconError::Json(_)));
    }
}
