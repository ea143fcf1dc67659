//! Error types shared across the rostersync workspace.

use thiserror::Error;

/// Errors that can occur while building or validating a sync dataset.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Two configuration settings contradict each other.
    #[error("Configuration conflict: {message}")]
    ConfigurationConflict { message: String },

    /// A single configuration setting is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An input file has an extension other than `.json` or `.csv`.
    #[error("Unsupported input format for '{path}': expected .json or .csv")]
    UnsupportedFormat { path: String },

    /// A cardinality guard rail was exceeded.
    #[error("Guard rail violated for {kind}: {message}")]
    GuardRail { kind: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV parse or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// Create a configuration conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConfigurationConflict {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(path: impl Into<String>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    /// Create a guard rail error.
    pub fn guard_rail(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GuardRail {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a configuration problem (raised before any
    /// record is processed).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigurationConflict { .. } | SyncError::Configuration { .. }
        )
    }

    /// Check if this error is a guard-rail violation.
    #[must_use]
    pub fn is_guard_rail(&self) -> bool {
        matches!(self, SyncError::GuardRail { .. })
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
