//! Domain types for the record log.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shale_core::CollectionId;

/// A single record appended to a collection's log.
///
/// The payload is an opaque byte blob; the log does not interpret its
/// structure. Offsets start at 1 and are unique per collection, assigned at
/// write time, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The collection this record belongs to.
    pub collection_id: CollectionId,
    /// Offset within the collection, strictly increasing.
    pub offset: u64,
    /// Wall-clock time at append.
    pub timestamp: DateTime<Utc>,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

/// Read-only view of a collection's log state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// The collection ID.
    pub collection_id: CollectionId,
    /// Highest offset assigned so far (0 when empty).
    pub enumeration_offset: u64,
    /// Highest offset known to be durably compacted (0 when none).
    pub compaction_offset: u64,
    /// Whether further appends are rejected.
    pub sealed: bool,
}

impl CollectionSnapshot {
    /// Number of assigned offsets not yet acknowledged as compacted.
    ///
    /// Purge only removes records at or below the compaction offset, so this
    /// is also the count of records awaiting compaction.
    #[must_use]
    pub const fn uncompacted(&self) -> u64 {
        self.enumeration_offset.saturating_sub(self.compaction_offset)
    }
}

/// A collection with uncompacted records, as seen by the compaction pipeline.
///
/// Returned by
/// [`LogStore::collections_ready_to_compact`](crate::store::LogStore::collections_ready_to_compact)
/// ordered by [`first_uncompacted_at`](Self::first_uncompacted_at) ascending,
/// oldest work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionCandidate {
    /// The collection with pending work.
    pub collection_id: CollectionId,
    /// Offset of the earliest record above the compaction boundary.
    pub earliest_uncompacted_offset: u64,
    /// Append timestamp of that record.
    pub first_uncompacted_at: DateTime<Utc>,
}

/// Outcome of a compaction boundary advance.
///
/// A stale request (at or below the current boundary) is a successful no-op,
/// not an error: the boundary is monotonic and advancing it is idempotent.
/// Callers log stale outcomes rather than propagating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The boundary moved forward.
    Advanced {
        /// Boundary before the advance.
        previous: u64,
        /// Boundary after the advance.
        current: u64,
    },
    /// The requested boundary was at or below the current one; nothing changed.
    Stale {
        /// The boundary that remains in effect.
        current: u64,
        /// The rejected (non-)advance.
        requested: u64,
    },
}

impl AdvanceOutcome {
    /// Returns true if the boundary moved forward.
    #[must_use]
    pub const fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }

    /// The boundary in effect after the call.
    #[must_use]
    pub const fn boundary(&self) -> u64 {
        match self {
            Self::Advanced { current, .. } | Self::Stale { current, .. } => *current,
        }
    }
}
