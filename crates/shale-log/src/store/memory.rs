//! In-memory [`LogStore`] implementation.
//!
//! Backed by a [`HashMap`] of per-collection state behind an [`RwLock`], with
//! records held in a [`BTreeMap`] keyed by offset so ranged reads and purges
//! are ordered scans. Intended for testing and local development; production
//! deployments use a relational backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use shale_core::CollectionId;

use crate::error::{Error, Result};
use crate::metrics;
use crate::record::{AdvanceOutcome, CollectionSnapshot, CompactionCandidate, Record};
use crate::store::LogStore;

/// Maps a lock poisoning error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// A record as held by the in-memory store; the offset is the map key.
#[derive(Debug, Clone)]
struct StoredRecord {
    timestamp: DateTime<Utc>,
    payload: Bytes,
}

/// Per-collection log state.
#[derive(Debug, Default)]
struct CollectionLog {
    /// Highest offset ever assigned; 0 before the first append.
    enumeration_offset: u64,
    /// Highest offset confirmed compacted; 0 before the first advance.
    compaction_offset: u64,
    /// Whether appends are disallowed.
    sealed: bool,
    /// Live records keyed by offset.
    records: BTreeMap<u64, StoredRecord>,
}

impl CollectionLog {
    fn snapshot(&self, collection_id: CollectionId) -> CollectionSnapshot {
        CollectionSnapshot {
            collection_id,
            enumeration_offset: self.enumeration_offset,
            compaction_offset: self.compaction_offset,
            sealed: self.sealed,
        }
    }
}

/// Thread-safe in-memory log store.
///
/// Writers take the map's write lock, so offset assignment is serialized per
/// process; this is the in-memory analog of the row lock a relational backend
/// takes on the collection row.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    collections: RwLock<HashMap<CollectionId, CollectionLog>>,
}

impl InMemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn collection_count(&self) -> Result<usize> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections.len())
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn register_collection(&self, collection_id: CollectionId) -> Result<()> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.entry(collection_id).or_default();
        Ok(())
    }

    async fn insert_records(
        &self,
        collection_id: CollectionId,
        payloads: Vec<Bytes>,
    ) -> Result<Vec<u64>> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(log) = collections.get_mut(&collection_id) else {
            drop(collections);
            return Err(Error::CollectionNotFound { collection_id });
        };
        if log.sealed {
            drop(collections);
            return Err(Error::CollectionSealed { collection_id });
        }
        if payloads.is_empty() {
            drop(collections);
            return Ok(Vec::new());
        }

        // Claim the contiguous block above the current enumeration offset.
        let first = log.enumeration_offset + 1;
        let last = log.enumeration_offset + payloads.len() as u64;
        if let Some((&offset, _)) = log.records.range(first..=last).next() {
            drop(collections);
            metrics::record_offset_conflict();
            return Err(Error::OffsetConflict {
                collection_id,
                offset,
            });
        }

        // One timestamp per batch: every record in the block shares it.
        let timestamp = Utc::now();
        let offsets: Vec<u64> = (first..=last).collect();
        for (offset, payload) in offsets.iter().zip(payloads) {
            log.records.insert(*offset, StoredRecord { timestamp, payload });
        }
        log.enumeration_offset = last;
        drop(collections);

        metrics::record_append(offsets.len());
        debug!(
            collection_id = %collection_id,
            first_offset = first,
            last_offset = last,
            "appended record batch"
        );
        Ok(offsets)
    }

    async fn get_records(
        &self,
        collection_id: CollectionId,
        from_offset: u64,
        max_count: usize,
        max_timestamp: DateTime<Utc>,
    ) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poison_err)?;
        let Some(log) = collections.get(&collection_id) else {
            drop(collections);
            return Err(Error::CollectionNotFound { collection_id });
        };

        let records: Vec<Record> = log
            .records
            .range(from_offset..)
            .filter(|(_, stored)| stored.timestamp <= max_timestamp)
            .take(max_count)
            .map(|(&offset, stored)| Record {
                collection_id,
                offset,
                timestamp: stored.timestamp,
                payload: stored.payload.clone(),
            })
            .collect();
        drop(collections);

        metrics::record_read(records.len());
        Ok(records)
    }

    async fn collections_ready_to_compact(&self) -> Result<Vec<CompactionCandidate>> {
        let collections = self.collections.read().map_err(poison_err)?;
        let mut candidates: Vec<CompactionCandidate> = collections
            .iter()
            .filter(|(_, log)| log.enumeration_offset > log.compaction_offset)
            .filter_map(|(&collection_id, log)| {
                let boundary = log.compaction_offset.saturating_add(1);
                log.records
                    .range(boundary..)
                    .next()
                    .map(|(&offset, stored)| CompactionCandidate {
                        collection_id,
                        earliest_uncompacted_offset: offset,
                        first_uncompacted_at: stored.timestamp,
                    })
            })
            .collect();
        drop(collections);

        candidates.sort_by(|a, b| {
            a.first_uncompacted_at
                .cmp(&b.first_uncompacted_at)
                .then_with(|| a.collection_id.cmp(&b.collection_id))
        });
        Ok(candidates)
    }

    async fn advance_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: u64,
    ) -> Result<AdvanceOutcome> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(log) = collections.get_mut(&collection_id) else {
            drop(collections);
            return Err(Error::CollectionNotFound { collection_id });
        };
        if new_offset > log.enumeration_offset {
            let enumeration = log.enumeration_offset;
            drop(collections);
            return Err(Error::InvalidCompactionOffset {
                collection_id,
                requested: new_offset,
                enumeration,
            });
        }
        if new_offset <= log.compaction_offset {
            let current = log.compaction_offset;
            drop(collections);
            return Ok(AdvanceOutcome::Stale {
                current,
                requested: new_offset,
            });
        }

        let previous = log.compaction_offset;
        log.compaction_offset = new_offset;
        drop(collections);

        debug!(
            collection_id = %collection_id,
            previous,
            current = new_offset,
            "advanced compaction offset"
        );
        Ok(AdvanceOutcome::Advanced {
            previous,
            current: new_offset,
        })
    }

    async fn seal_collection(&self, collection_id: CollectionId) -> Result<()> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(log) = collections.get_mut(&collection_id) else {
            drop(collections);
            return Err(Error::CollectionNotFound { collection_id });
        };
        log.sealed = true;
        Ok(())
    }

    async fn collection(&self, collection_id: CollectionId) -> Result<Option<CollectionSnapshot>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections
            .get(&collection_id)
            .map(|log| log.snapshot(collection_id)))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionSnapshot>> {
        let collections = self.collections.read().map_err(poison_err)?;
        let mut snapshots: Vec<CollectionSnapshot> = collections
            .iter()
            .map(|(&collection_id, log)| log.snapshot(collection_id))
            .collect();
        drop(collections);

        snapshots.sort_by_key(|snapshot| snapshot.collection_id);
        Ok(snapshots)
    }

    async fn purge_compacted(&self, collection_id: CollectionId) -> Result<u64> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(log) = collections.get_mut(&collection_id) else {
            drop(collections);
            return Err(Error::CollectionNotFound { collection_id });
        };

        // Split at the boundary: everything at or below it is purged.
        let kept = log.records.split_off(&log.compaction_offset.saturating_add(1));
        let purged = log.records.len() as u64;
        log.records = kept;
        drop(collections);

        if purged > 0 {
            debug!(collection_id = %collection_id, purged, "purged compacted records");
        }
        Ok(purged)
    }

    async fn drop_collection(&self, collection_id: CollectionId) -> Result<bool> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        Ok(collections.remove(&collection_id).is_some())
    }

    async fn backlog_depth(&self) -> Result<u64> {
        let collections = self.collections.read().map_err(poison_err)?;
        // Offsets are gapless and purge never reaches above the boundary, so
        // the uncompacted span equals the live record count above it.
        Ok(collections
            .values()
            .map(|log| log.enumeration_offset.saturating_sub(log.compaction_offset))
            .sum())
    }

    async fn vacuum(&self) -> Result<u64> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.shrink_to_fit();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn payloads(count: usize) -> Vec<Bytes> {
        (0..count)
            .map(|i| Bytes::from(format!("payload-{i}")))
            .collect()
    }

    async fn store_with_collection() -> (InMemoryLogStore, CollectionId) {
        let store = InMemoryLogStore::new();
        let collection_id = CollectionId::generate();
        store
            .register_collection(collection_id)
            .await
            .expect("register collection");
        (store, collection_id)
    }

    #[tokio::test]
    async fn register_creates_empty_log_state() {
        let (store, collection_id) = store_with_collection().await;

        let snapshot = store
            .collection(collection_id)
            .await
            .expect("fetch collection")
            .expect("collection registered");
        assert_eq!(snapshot.enumeration_offset, 0);
        assert_eq!(snapshot.compaction_offset, 0);
        assert!(!snapshot.sealed);
        assert_eq!(snapshot.uncompacted(), 0);
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert records");

        store
            .register_collection(collection_id)
            .await
            .expect("re-register collection");

        let snapshot = store
            .collection(collection_id)
            .await
            .expect("fetch collection")
            .expect("collection registered");
        assert_eq!(snapshot.enumeration_offset, 3);
        assert_eq!(store.collection_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn insert_assigns_contiguous_offsets_from_one() {
        let (store, collection_id) = store_with_collection().await;

        let offsets = store
            .insert_records(collection_id, payloads(4))
            .await
            .expect("insert records");

        assert_eq!(offsets, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn insert_batches_stay_gapless() {
        let (store, collection_id) = store_with_collection().await;

        let mut all_offsets = Vec::new();
        for _ in 0..8 {
            let offsets = store
                .insert_records(collection_id, payloads(5))
                .await
                .expect("insert batch");
            all_offsets.extend(offsets);
        }

        let expected: Vec<u64> = (1..=40).collect();
        assert_eq!(all_offsets, expected);
    }

    #[tokio::test]
    async fn insert_empty_batch_returns_no_offsets() {
        let (store, collection_id) = store_with_collection().await;

        let offsets = store
            .insert_records(collection_id, Vec::new())
            .await
            .expect("insert empty batch");

        assert!(offsets.is_empty());
        let snapshot = store
            .collection(collection_id)
            .await
            .expect("fetch collection")
            .expect("collection registered");
        assert_eq!(snapshot.enumeration_offset, 0);
    }

    #[tokio::test]
    async fn insert_unknown_collection_fails() {
        let store = InMemoryLogStore::new();

        let result = store
            .insert_records(CollectionId::generate(), payloads(1))
            .await;

        assert!(matches!(result, Err(Error::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn insert_sealed_collection_fails() {
        let (store, collection_id) = store_with_collection().await;
        store
            .seal_collection(collection_id)
            .await
            .expect("seal collection");

        let result = store.insert_records(collection_id, payloads(1)).await;

        assert!(matches!(result, Err(Error::CollectionSealed { .. })));
    }

    #[tokio::test]
    async fn insert_batch_shares_one_timestamp() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert batch");

        let records = store
            .get_records(collection_id, 1, 10, Utc::now())
            .await
            .expect("read records");

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.timestamp == records[0].timestamp));
    }

    #[tokio::test]
    async fn concurrent_inserts_never_overlap() {
        let store = Arc::new(InMemoryLogStore::new());
        let collection_id = CollectionId::generate();
        store
            .register_collection(collection_id)
            .await
            .expect("register collection");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_records(collection_id, payloads(5))
                    .await
                    .expect("insert batch")
            }));
        }

        let mut all_offsets = Vec::new();
        for handle in handles {
            let offsets = handle.await.expect("join task");
            // Each batch is contiguous within itself.
            for pair in offsets.windows(2) {
                assert_eq!(pair[1], pair[0] + 1);
            }
            all_offsets.extend(offsets);
        }

        all_offsets.sort_unstable();
        let expected: Vec<u64> = (1..=40).collect();
        assert_eq!(all_offsets, expected);
    }

    #[tokio::test]
    async fn get_records_returns_ascending_from_offset() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(5))
            .await
            .expect("insert batch");

        let records = store
            .get_records(collection_id, 3, 10, Utc::now())
            .await
            .expect("read records");

        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn get_records_respects_max_count() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(10))
            .await
            .expect("insert batch");

        let records = store
            .get_records(collection_id, 1, 4, Utc::now())
            .await
            .expect("read records");

        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn get_records_respects_max_timestamp() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(2))
            .await
            .expect("insert first batch");
        let cutoff = Utc::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store
            .insert_records(collection_id, payloads(2))
            .await
            .expect("insert second batch");

        let records = store
            .get_records(collection_id, 1, 10, cutoff)
            .await
            .expect("read records");

        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![1, 2]);
    }

    #[tokio::test]
    async fn get_records_unknown_collection_fails() {
        let store = InMemoryLogStore::new();

        let result = store
            .get_records(CollectionId::generate(), 1, 10, Utc::now())
            .await;

        assert!(matches!(result, Err(Error::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn get_records_resumes_after_last_offset() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(7))
            .await
            .expect("insert batch");

        let mut seen = Vec::new();
        let mut from_offset = 1;
        loop {
            let page = store
                .get_records(collection_id, from_offset, 3, Utc::now())
                .await
                .expect("read page");
            let Some(last) = page.last() else {
                break;
            };
            from_offset = last.offset + 1;
            seen.extend(page.iter().map(|r| r.offset));
        }

        let expected: Vec<u64> = (1..=7).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn advance_moves_boundary_monotonically() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(5))
            .await
            .expect("insert batch");

        let outcome = store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("advance boundary");
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                previous: 0,
                current: 3
            }
        );

        // A smaller or equal offset leaves the boundary alone.
        let stale = store
            .advance_compaction_offset(collection_id, 2)
            .await
            .expect("stale advance");
        assert_eq!(
            stale,
            AdvanceOutcome::Stale {
                current: 3,
                requested: 2
            }
        );
        let repeat = store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("repeat advance");
        assert!(!repeat.is_advanced());
        assert_eq!(repeat.boundary(), 3);
    }

    #[tokio::test]
    async fn advance_beyond_enumeration_fails() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(2))
            .await
            .expect("insert batch");

        let result = store.advance_compaction_offset(collection_id, 3).await;

        assert!(matches!(
            result,
            Err(Error::InvalidCompactionOffset {
                requested: 3,
                enumeration: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn advance_unknown_collection_fails() {
        let store = InMemoryLogStore::new();

        let result = store
            .advance_compaction_offset(CollectionId::generate(), 1)
            .await;

        assert!(matches!(result, Err(Error::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn ready_to_compact_orders_by_earliest_uncompacted() {
        let store = InMemoryLogStore::new();
        let first = CollectionId::generate();
        let second = CollectionId::generate();
        for id in [first, second] {
            store.register_collection(id).await.expect("register");
        }

        store
            .insert_records(first, payloads(2))
            .await
            .expect("insert into first");
        tokio::time::sleep(Duration::from_millis(5)).await;
        store
            .insert_records(second, payloads(2))
            .await
            .expect("insert into second");

        let candidates = store
            .collections_ready_to_compact()
            .await
            .expect("list candidates");
        let order: Vec<CollectionId> = candidates.iter().map(|c| c.collection_id).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(candidates[0].earliest_uncompacted_offset, 1);

        // Compacting the older collection moves it behind the newer one.
        store
            .advance_compaction_offset(first, 2)
            .await
            .expect("advance first");
        tokio::time::sleep(Duration::from_millis(5)).await;
        store
            .insert_records(first, payloads(1))
            .await
            .expect("insert into first again");

        let candidates = store
            .collections_ready_to_compact()
            .await
            .expect("list candidates");
        let order: Vec<CollectionId> = candidates.iter().map(|c| c.collection_id).collect();
        assert_eq!(order, vec![second, first]);
        assert_eq!(candidates[1].earliest_uncompacted_offset, 3);
    }

    #[tokio::test]
    async fn ready_to_compact_skips_caught_up_collections() {
        let (store, collection_id) = store_with_collection().await;

        assert!(store
            .collections_ready_to_compact()
            .await
            .expect("empty store")
            .is_empty());

        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert batch");
        store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("advance to head");

        assert!(store
            .collections_ready_to_compact()
            .await
            .expect("caught up")
            .is_empty());
    }

    #[tokio::test]
    async fn purge_removes_records_up_to_boundary() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(5))
            .await
            .expect("insert batch");
        store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("advance boundary");

        let purged = store
            .purge_compacted(collection_id)
            .await
            .expect("purge records");
        assert_eq!(purged, 3);

        let records = store
            .get_records(collection_id, 1, 10, Utc::now())
            .await
            .expect("read survivors");
        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![4, 5]);
    }

    #[tokio::test]
    async fn purge_is_idempotent() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(4))
            .await
            .expect("insert batch");
        store
            .advance_compaction_offset(collection_id, 2)
            .await
            .expect("advance boundary");

        assert_eq!(store.purge_compacted(collection_id).await.expect("purge"), 2);
        assert_eq!(
            store
                .purge_compacted(collection_id)
                .await
                .expect("repeat purge"),
            0
        );
    }

    #[tokio::test]
    async fn purge_before_any_advance_removes_nothing() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert batch");

        assert_eq!(store.purge_compacted(collection_id).await.expect("purge"), 0);
    }

    #[tokio::test]
    async fn compact_purge_append_cycle_keeps_offsets_gapless() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(5))
            .await
            .expect("insert batch");
        store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("advance boundary");
        store
            .purge_compacted(collection_id)
            .await
            .expect("purge records");

        // New appends continue from the enumeration offset, not from the
        // surviving records.
        let offsets = store
            .insert_records(collection_id, payloads(2))
            .await
            .expect("insert after purge");
        assert_eq!(offsets, vec![6, 7]);

        let records = store
            .get_records(collection_id, 1, 10, Utc::now())
            .await
            .expect("read all");
        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![4, 5, 6, 7]);
        assert_eq!(store.backlog_depth().await.expect("backlog"), 4);
    }

    #[tokio::test]
    async fn sealed_collection_still_reads_and_compacts() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert batch");
        store
            .seal_collection(collection_id)
            .await
            .expect("seal collection");
        store
            .seal_collection(collection_id)
            .await
            .expect("repeat seal");

        let records = store
            .get_records(collection_id, 1, 10, Utc::now())
            .await
            .expect("read sealed");
        assert_eq!(records.len(), 3);

        store
            .advance_compaction_offset(collection_id, 3)
            .await
            .expect("advance sealed");
        assert_eq!(
            store
                .purge_compacted(collection_id)
                .await
                .expect("purge sealed"),
            3
        );
    }

    #[tokio::test]
    async fn drop_collection_removes_all_state() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(3))
            .await
            .expect("insert batch");

        assert!(store
            .drop_collection(collection_id)
            .await
            .expect("drop collection"));
        assert!(!store
            .drop_collection(collection_id)
            .await
            .expect("repeat drop"));

        let result = store.insert_records(collection_id, payloads(1)).await;
        assert!(matches!(result, Err(Error::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn backlog_depth_sums_uncompacted_records() {
        let store = InMemoryLogStore::new();
        let first = CollectionId::generate();
        let second = CollectionId::generate();
        for id in [first, second] {
            store.register_collection(id).await.expect("register");
        }

        assert_eq!(store.backlog_depth().await.expect("empty backlog"), 0);

        store
            .insert_records(first, payloads(5))
            .await
            .expect("insert into first");
        store
            .insert_records(second, payloads(3))
            .await
            .expect("insert into second");
        assert_eq!(store.backlog_depth().await.expect("backlog"), 8);

        store
            .advance_compaction_offset(first, 4)
            .await
            .expect("advance first");
        assert_eq!(store.backlog_depth().await.expect("backlog"), 4);

        // Purge does not change the backlog; only the boundary does.
        store.purge_compacted(first).await.expect("purge first");
        assert_eq!(store.backlog_depth().await.expect("backlog"), 4);
    }

    #[tokio::test]
    async fn list_collections_orders_by_id() {
        let store = InMemoryLogStore::new();
        let mut ids: Vec<CollectionId> = (0..4).map(|_| CollectionId::generate()).collect();
        for id in &ids {
            store.register_collection(*id).await.expect("register");
        }

        let snapshots = store.list_collections().await.expect("list collections");
        let listed: Vec<CollectionId> = snapshots.iter().map(|s| s.collection_id).collect();
        ids.sort();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn vacuum_succeeds_on_live_store() {
        let (store, collection_id) = store_with_collection().await;
        store
            .insert_records(collection_id, payloads(2))
            .await
            .expect("insert batch");

        assert_eq!(store.vacuum().await.expect("vacuum"), 0);

        // State survives reclamation.
        let snapshot = store
            .collection(collection_id)
            .await
            .expect("fetch collection")
            .expect("collection registered");
        assert_eq!(snapshot.enumeration_offset, 2);
    }
}
