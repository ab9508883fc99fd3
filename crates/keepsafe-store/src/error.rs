//! Error types for record store operations

use thiserror::Error;

/// Errors that can occur while reading or writing records
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key, container or name was empty or otherwise unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid store or backend configuration
    #[error("Invalid store configuration: {0}")]
    InvalidConfiguration(String),

    /// Failure reported by the storage primitive, passed through unchanged
    #[error("Backend error: {0}")]
    Backend(#[from] std::io::Error),

    /// The codec could not encode the value
    #[error("Encode error: {0}")]
    Encode(String),

    /// The codec could not decode the bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// The primary entry exists but does not hold a valid encoding, and no
    /// backup was available to recover from
    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord {
        /// Display form of the record key
        key: String,
        /// Short description of why decoding failed
        reason: String,
    },

    /// The operation observed a cancellation request before the primary
    /// entry was replaced
    #[error("Operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// True when the backend reported a missing entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(err) if err.kind() == std::io::ErrorKind::NotFound)
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptRecord { .. })
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
