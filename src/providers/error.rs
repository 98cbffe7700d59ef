//! Error types for backup provider operations
//!
//! Every provider backend maps its transport-level failures onto this enum so the
//! manager can treat backends uniformly. The variants that matter for control flow
//! are `NotFound` (purge treats it as an already-deleted backup) and `Conflict`
//! (the provider refused to start a backup because one is already running).

use thiserror::Error;

/// Errors that can occur when talking to a backup provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network-related errors (connection issues, DNS failures)
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// Request took longer than the allowed timeout
    #[error("Request timeout after {seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        seconds: u64,
    },

    /// Error reported by the provider API itself
    #[error("Provider error: {message}")]
    Api {
        /// Error message from the provider
        message: String,
        /// Optional status or error code
        code: Option<String>,
    },

    /// The referenced backup does not exist on the provider
    #[error("Backup '{slug}' does not exist")]
    NotFound {
        /// Backup identifier
        slug: String,
    },

    /// Another backup is already in progress
    #[error("Provider error: {message}. There may be a backup already in progress")]
    Conflict {
        /// Error message from the provider
        message: String,
    },

    /// Operation not supported by this backend
    #[error("Operation '{operation}' is not supported by this provider")]
    Unsupported {
        /// Name of the unsupported operation
        operation: String,
    },

    /// Failed to write a downloaded backup to disk
    #[error("I/O error: {message}")]
    Io {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Configuration errors (missing base URL, empty token)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl ProviderError {
    /// Returns true if the provider reported the backup as missing
    ///
    /// The purge sweep treats this as an already-effectively-deleted backup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    /// Creates a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a timeout error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Creates a provider API error
    pub fn api(message: impl Into<String>, code: Option<impl Into<String>>) -> Self {
        Self::Api {
            message: message.into(),
            code: code.map(|c| c.into()),
        }
    }

    /// Creates a not-found error
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    /// Creates a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an unsupported-operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Creates an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Converts a reqwest error, attributing timeouts to the given duration
    pub fn from_reqwest(err: reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                seconds: timeout_seconds,
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
