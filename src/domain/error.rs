//! Domain-level error types for lifelog.
//!
//! All errors are typed with `thiserror`. Codec and parser functions return
//! them as values; nothing in the library aborts the process.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Serializing records (backup JSON) failed.
    #[error("Encode error: {message}")]
    Encode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A backup did not decode into the expected array of records.
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Writing an export or backup file failed.
    #[error("Failed to write {}: {message}", path.display())]
    Write {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A stale export at the fixed destination could not be removed.
    #[error("Failed to delete old file {}", path.display())]
    DeleteOldFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The export directory could not be created.
    #[error("Failed to create directory {}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An import source was unreadable, in the wrong encoding, or corrupt.
    #[error("Failed to read the backup data: {message}")]
    Read {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to open or query the record store.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A record with the requested id does not exist.
    #[error("Log not found: {id}")]
    NotFound { id: String },

    /// Invalid user input or stored data.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create an encode error from a serde failure.
    pub fn encode(err: serde_json::Error) -> Self {
        Self::Encode {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a JSON decode error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a read error without an underlying cause.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
            source: None,
        }
    }

    /// Create a read error wrapping an underlying cause.
    pub fn read_with<E>(message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Read {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create an invalid data error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_message() {
        let err = AppError::read("wrong encoding");
        assert_eq!(
            err.to_string(),
            "Failed to read the backup data: wrong encoding"
        );
    }

    #[test]
    fn test_delete_error_keeps_source() {
        let err = AppError::DeleteOldFile {
            path: PathBuf::from("/tmp/export_file.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("export_file.csv"));
    }
}
