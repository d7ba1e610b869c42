//! # shale-log
//!
//! Append-only record log with offset-based compaction for shale.
//!
//! This crate implements the log domain, providing:
//!
//! - **Per-Collection Logs**: Durable, ordered append streams keyed by a
//!   strictly increasing offset per collection
//! - **Compaction Tracking**: A monotonic per-collection boundary below which
//!   records are durably compacted and safe to purge
//! - **Work Queue**: The compaction pipeline's view of collections with
//!   uncompacted records
//! - **Catalog Contract**: The narrow interface to the external metadata
//!   catalog that owns collection lifecycle
//!
//! ## Core Concepts
//!
//! - **Collection**: A logical named stream of records with its own offset
//!   sequence starting at 1
//! - **Record**: An opaque payload plus the offset and timestamp assigned at
//!   append time; immutable until purged
//! - **Compaction boundary**: Advanced only by the external compaction
//!   pipeline, never by the log itself
//!
//! ## Guarantees
//!
//! - **Serialized offsets**: Concurrent appenders to one collection never
//!   receive overlapping offsets
//! - **Atomic batches**: Readers never observe a partially visible append
//! - **Monotonic boundary**: The compaction offset never moves backward
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use chrono::Utc;
//! use shale_core::CollectionId;
//! use shale_log::error::Result;
//! use shale_log::store::{InMemoryLogStore, LogStore};
//!
//! # async fn example() -> Result<()> {
//! let store = InMemoryLogStore::new();
//! let collection = CollectionId::generate();
//!
//! store.register_collection(collection).await?;
//! let offsets = store
//!     .insert_records(collection, vec![Bytes::from_static(b"a")])
//!     .await?;
//! assert_eq!(offsets, vec![1]);
//!
//! let records = store.get_records(collection, 1, 10, Utc::now()).await?;
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod metrics;
pub mod record;
pub mod store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::{CatalogView, InMemoryCatalog};
    pub use crate::error::{Error, Result};
    pub use crate::record::{AdvanceOutcome, CollectionSnapshot, CompactionCandidate, Record};
    pub use crate::store::{InMemoryLogStore, LogStore};
}

pub use catalog::{CatalogView, InMemoryCatalog};
pub use error::{Error, Result};
pub use record::{AdvanceOutcome, CollectionSnapshot, CompactionCandidate, Record};
pub use store::{InMemoryLogStore, LogStore};
