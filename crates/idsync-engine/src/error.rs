//! Engine error types.

use thiserror::Error;

use idsync_store::StoreError;

/// Errors that can occur during a reconciliation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A bulk fetch from one of the stores failed. Fatal: the run aborts
    /// before any mutation and the watermark is not advanced.
    #[error("fetch from {store} failed: {source}")]
    Fetch {
        store: &'static str,
        #[source]
        source: StoreError,
    },

    /// A configured group could not be resolved against the directory.
    #[error("unresolved group: {group}")]
    UnresolvedGroup { group: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Store error outside the fetch phase.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Database error (watermark persistence).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    /// Create a fetch error.
    pub fn fetch(store: &'static str, source: StoreError) -> Self {
        Self::Fetch { store, source }
    }

    /// Create an unresolved group error.
    pub fn unresolved_group(group: impl Into<String>) -> Self {
        Self::UnresolvedGroup {
            group: group.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check whether this error aborts a run before any mutation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Fetch { .. }
                | EngineError::UnresolvedGroup { .. }
                | EngineError::Configuration { .. }
        )
    }
}

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, EngineError>;
