//! Common error types for UHAN forms

use thiserror::Error;

/// Common result type for UHAN operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the form pipeline and the service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend refused a write because it is full
    #[error("Storage quota exceeded for key '{key}' ({needed} bytes needed, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Backend did not answer in time
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors raised at a storage/network boundary, where a local
    /// fallback is an acceptable recovery.
    pub fn is_io(&self) -> bool {
        match self {
            #[cfg(feature = "sqlx")]
            Error::Database(_) => true,
            Error::Io(_) | Error::QuotaExceeded { .. } | Error::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_names_key() {
        let err = Error::QuotaExceeded {
            key: "ulci_history".to_string(),
            needed: 120,
            available: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("ulci_history"));
        assert!(msg.contains("120"));
    }

    #[test]
    fn test_is_io_classification() {
        assert!(Error::Timeout(500).is_io());
        assert!(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")).is_io());
        assert!(!Error::InvalidInput("name".to_string()).is_io());
        assert!(!Error::NotFound("x".to_string()).is_io());
    }
}
