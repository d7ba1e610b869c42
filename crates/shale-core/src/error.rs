//! Error types and result aliases for shale.
//!
//! This module defines the shared error types used across all shale components.
//! Errors are structured for programmatic handling and include context for debugging.

/// The result type used throughout shale.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shale core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
