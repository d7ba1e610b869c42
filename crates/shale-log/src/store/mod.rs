//! Storage abstraction for the record log.
//!
//! This module defines the [`LogStore`] trait, the persistence interface for
//! per-collection append logs and their compaction boundaries:
//!
//! - **Testing/development**: [`InMemoryLogStore`]
//! - **Production**: a relational backend keyed by `(collection_id, offset)`,
//!   serializing writers with a row lock on the collection row
//!
//! ## Offset Assignment
//!
//! Appends use a claim-then-write pattern: serialize writers per collection,
//! claim the contiguous block `[enumeration+1, enumeration+n]`, persist all
//! `n` records with those offsets, then advance the enumeration offset. The
//! whole batch commits atomically, so readers never observe a torn batch and
//! no two concurrent appenders receive overlapping offsets.
//!
//! ## Compaction Boundary
//!
//! The boundary is advanced only through
//! [`advance_compaction_offset`](LogStore::advance_compaction_offset), called
//! by the external compaction pipeline after it has durably persisted records.
//! The store never advances it autonomously, and it never moves backward.

pub mod memory;

pub use memory::InMemoryLogStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use shale_core::CollectionId;

use crate::error::Result;
use crate::record::{AdvanceOutcome, CollectionSnapshot, CompactionCandidate, Record};

/// Persistence interface for the record log.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from async
/// tasks; implementations serialize offset assignment per collection.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Creates empty log state for a collection.
    ///
    /// This is the cascade hook for catalog-side creation: the catalog owns
    /// collection lifecycle and registers collections here before producers
    /// may append. Registering an existing collection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage fails.
    async fn register_collection(&self, collection_id: CollectionId) -> Result<()>;

    /// Appends a batch of payloads, returning the assigned offsets in input order.
    ///
    /// Atomically reserves the contiguous offset block
    /// `[enumeration+1, enumeration+n]` and persists one record per payload
    /// with a single append timestamp. An empty batch is a no-op returning an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// - [`Error::CollectionNotFound`](crate::error::Error::CollectionNotFound)
    ///   if the collection is unknown
    /// - [`Error::CollectionSealed`](crate::error::Error::CollectionSealed)
    ///   if appends are disallowed
    /// - [`Error::OffsetConflict`](crate::error::Error::OffsetConflict) if the
    ///   claimed range is already occupied; nothing is written and the caller
    ///   may retry
    /// - [`Error::Storage`](crate::error::Error::Storage) on backend failure
    async fn insert_records(
        &self,
        collection_id: CollectionId,
        payloads: Vec<Bytes>,
    ) -> Result<Vec<u64>>;

    /// Reads records with `offset >= from_offset` and
    /// `timestamp <= max_timestamp`, ascending by offset, at most `max_count`.
    ///
    /// An empty result is not an error. The read is restartable: callers
    /// resume by passing `last.offset + 1` as the next `from_offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`](crate::error::Error::CollectionNotFound)
    /// for an unknown collection, or a storage error on backend failure.
    async fn get_records(
        &self,
        collection_id: CollectionId,
        from_offset: u64,
        max_count: usize,
        max_timestamp: DateTime<Utc>,
    ) -> Result<Vec<Record>>;

    /// Returns every collection with at least one record above its compaction
    /// boundary, ordered by the earliest uncompacted record's timestamp
    /// ascending (collection ID as deterministic tie-break).
    ///
    /// This is the compaction pipeline's work queue: oldest pending work first.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn collections_ready_to_compact(&self) -> Result<Vec<CompactionCandidate>>;

    /// Advances the compaction boundary for a collection.
    ///
    /// Monotonic and idempotent: a `new_offset` at or below the current
    /// boundary yields [`AdvanceOutcome::Stale`] without changing anything.
    /// The boundary never moves backward.
    ///
    /// # Errors
    ///
    /// - [`Error::CollectionNotFound`](crate::error::Error::CollectionNotFound)
    ///   for an unknown collection
    /// - [`Error::InvalidCompactionOffset`](crate::error::Error::InvalidCompactionOffset)
    ///   if `new_offset` exceeds the enumeration offset
    async fn advance_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: u64,
    ) -> Result<AdvanceOutcome>;

    /// Marks a collection as sealed; subsequent appends fail.
    ///
    /// Reads, compaction advances, and purge continue to work on a sealed
    /// collection. Sealing an already sealed collection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`](crate::error::Error::CollectionNotFound)
    /// for an unknown collection.
    async fn seal_collection(&self, collection_id: CollectionId) -> Result<()>;

    /// Returns the log state for one collection, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn collection(&self, collection_id: CollectionId) -> Result<Option<CollectionSnapshot>>;

    /// Returns the log state of every collection, ordered by collection ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn list_collections(&self) -> Result<Vec<CollectionSnapshot>>;

    /// Deletes every record with `offset <= compaction_offset` for one
    /// collection, returning the number removed.
    ///
    /// Idempotent: a second call with no intervening advance removes nothing.
    /// Purge is per-collection so a multi-collection pass remains resumable
    /// after a partial failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`](crate::error::Error::CollectionNotFound)
    /// for an unknown collection, or a storage error on backend failure.
    async fn purge_compacted(&self, collection_id: CollectionId) -> Result<u64>;

    /// Removes a collection's log state and all its records.
    ///
    /// This is the cascade hook for catalog-side deletion. Returns whether
    /// the collection existed.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn drop_collection(&self, collection_id: CollectionId) -> Result<bool>;

    /// Total count of records across all collections with
    /// `offset > compaction_offset`.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn backlog_depth(&self) -> Result<u64>;

    /// Storage-level reclamation hook for the deep garbage-collection pass.
    ///
    /// Relational backends run VACUUM-style maintenance here; the in-memory
    /// store releases spare map capacity. Returns an implementation-defined
    /// count of reclaimed storage units.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn vacuum(&self) -> Result<u64>;
}
