//! Error types for the log store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading, mutating, or persisting the collection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persisted collection exists but could not be read.
    #[error("failed to read log collection at {path}: {source}")]
    StorageRead {
        /// Location of the persisted collection.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The persisted collection was read but is not a JSON array of entries.
    #[error("log collection at {path} is corrupt: {source}")]
    Corrupt {
        /// Location of the persisted collection.
        path: PathBuf,
        /// Underlying decode failure.
        source: serde_json::Error,
    },

    /// The collection could not be written back.
    #[error("failed to write log collection to {path}: {source}")]
    StorageWrite {
        /// Location of the persisted collection.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The collection could not be encoded as JSON.
    #[error("failed to encode log collection: {0}")]
    Encode(#[from] serde_json::Error),

    /// A tenant code was required but missing or blank.
    #[error("code required")]
    MissingCode,

    /// The store configuration is unusable.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Returns true if the error was caused by the caller's input rather than
    /// by the storage medium.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::MissingCode)
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = StoreError::MissingCode;
        assert_eq!(err.to_string(), "code required");

        let err = StoreError::StorageWrite {
            path: PathBuf::from("/tmp/logs.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(
            err.to_string(),
            "failed to write log collection to /tmp/logs.json: disk full"
        );
    }

    #[test]
    fn validation_classification() {
        assert!(StoreError::MissingCode.is_validation());
        assert!(
            !StoreError::StorageRead {
                path: PathBuf::from("logs.json"),
                source: std::io::Error::other("denied"),
            }
            .is_validation()
        );
        assert!(!StoreError::InvalidConfig("zero capacity".to_string()).is_validation());
    }

    #[test]
    fn error_source_is_preserved() {
        use std::error::Error as _;

        let err = StoreError::StorageRead {
            path: PathBuf::from("logs.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
