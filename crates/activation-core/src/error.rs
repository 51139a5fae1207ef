//! Error types for the activation subsystem.

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::storage::KeyValueStore).
///
/// Quota exhaustion is kept apart from every other failure because it is the
/// only storage error the cache layer knows how to recover from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store refused the write because it is full.
    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// Reading or writing the backing medium failed.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The store cannot be used at all (e.g. its directory is missing).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates a QuotaExceeded error
    pub fn quota_exceeded(key: impl Into<String>) -> Self {
        Self::QuotaExceeded { key: key.into() }
    }

    /// Check if this is a quota error
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

/// A shared error type for the activation subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// A step index outside 1..=6
    #[error("Invalid wizard step: {0}")]
    InvalidStep(i64),

    /// The payload's shape belongs to a different step than the one addressed
    #[error("Payload for step {payload} cannot be written to step {step}")]
    StepMismatch { step: u8, payload: u8 },

    /// Document attachments sent with a step that carries no file fields
    #[error("Step {0} does not accept document attachments")]
    UnexpectedAttachments(u8),

    /// Local durable storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Remote service unreachable or answered with a non-success status
    #[error("Remote error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActivationError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Remote error without an HTTP status (transport failure)
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Remote error for a non-success HTTP status
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a remote error
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if this error is a storage quota failure
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_quota_exceeded())
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ActivationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ActivationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ActivationError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ActivationError>`.
pub type Result<T> = std::result::Result<T, ActivationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_includes_status() {
        let err = ActivationError::remote_status(503, "service unavailable");
        assert_eq!(
            err.to_string(),
            "Remote error (HTTP 503): service unavailable"
        );

        let err = ActivationError::remote("connection refused");
        assert_eq!(err.to_string(), "Remote error: connection refused");
    }

    #[test]
    fn test_quota_detection_through_wrapper() {
        let err: ActivationError = StorageError::quota_exceeded("activation_progress").into();
        assert!(err.is_quota_exceeded());
        assert!(!ActivationError::remote("x").is_quota_exceeded());
    }
}
