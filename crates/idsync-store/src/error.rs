//! Store error types.
//!
//! Error definitions with transient/permanent classification, shared by the
//! directory and HR store boundaries.

use thiserror::Error;

/// Error that can occur when talking to one of the backing stores.
#[derive(Debug, Error)]
pub enum StoreError {
    // Connection errors (usually transient)
    /// Failed to establish a connection to the store.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// The store is temporarily unavailable.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    // Lookup errors
    /// Record not found in the store.
    #[error("record not found: {key}")]
    RecordNotFound { key: String },

    /// A configured group could not be resolved in the directory.
    #[error("group not found: {group}")]
    GroupNotFound { group: String },

    // Write errors
    /// Saving a record failed.
    #[error("save failed for '{key}': {message}")]
    SaveFailed {
        key: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The store rejected the data (constraint violation, bad format).
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    // Internal errors
    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Check if this error is transient and the operation may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed { .. }
                | StoreError::ConnectionTimeout { .. }
                | StoreError::Unavailable { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            StoreError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            StoreError::Unavailable { .. } => "UNAVAILABLE",
            StoreError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            StoreError::GroupNotFound { .. } => "GROUP_NOT_FOUND",
            StoreError::SaveFailed { .. } => "SAVE_FAILED",
            StoreError::InvalidData { .. } => "INVALID_DATA",
            StoreError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        StoreError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a record not found error.
    pub fn record_not_found(key: impl Into<String>) -> Self {
        StoreError::RecordNotFound { key: key.into() }
    }

    /// Create a group not found error.
    pub fn group_not_found(group: impl Into<String>) -> Self {
        StoreError::GroupNotFound {
            group: group.into(),
        }
    }

    /// Create a save failed error.
    pub fn save_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::SaveFailed {
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        StoreError::InvalidData {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
