//! Error types for the janitor daemon.

use thiserror::Error;

/// Result type alias for janitor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the janitor.
#[derive(Debug, Error)]
pub enum Error {
    /// A log store operation failed.
    #[error(transparent)]
    Log(#[from] shale_log::Error),

    /// The leader election backend failed.
    ///
    /// The campaign treats this as "not leader": gated work pauses and no
    /// instance acts until the backend recovers.
    #[error("election error: {message}")]
    Election {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the invalid setting.
        message: String,
    },
}

impl Error {
    /// Creates an election error.
    pub fn election(message: impl Into<String>) -> Self {
        Self::Election {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an election error with an underlying cause.
    pub fn election_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Election {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
