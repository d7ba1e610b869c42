//! Error types for the record log domain.

use shale_core::CollectionId;

/// The result type used throughout shale-log.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in record log operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collection was not found in the log.
    #[error("collection not found: {collection_id}")]
    CollectionNotFound {
        /// The collection ID that was not found.
        collection_id: CollectionId,
    },

    /// An append was attempted against a sealed collection.
    #[error("collection sealed: {collection_id}")]
    CollectionSealed {
        /// The sealed collection ID.
        collection_id: CollectionId,
    },

    /// Two writers claimed overlapping offsets for the same collection.
    ///
    /// Offset assignment is serialized per collection, so this indicates an
    /// invariant violation in the storage backend. The attempt is aborted
    /// with nothing written; the caller may retry.
    #[error("offset conflict in collection {collection_id} at offset {offset}")]
    OffsetConflict {
        /// The collection with the conflicting assignment.
        collection_id: CollectionId,
        /// The first already-occupied offset in the claimed range.
        offset: u64,
    },

    /// A compaction advance targeted an offset beyond the enumeration offset.
    ///
    /// The boundary can never exceed the highest assigned offset; a request
    /// past it indicates a compaction-pipeline bug and is rejected rather
    /// than clamped.
    #[error(
        "invalid compaction offset for collection {collection_id}: \
         requested {requested}, enumeration offset is {enumeration}"
    )]
    InvalidCompactionOffset {
        /// The collection whose boundary was targeted.
        collection_id: CollectionId,
        /// The requested boundary.
        requested: u64,
        /// The collection's current enumeration offset.
        enumeration: u64,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error from shale-core.
    #[error("core error: {0}")]
    Core(#[from] shale_core::Error),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
