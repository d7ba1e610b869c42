//! Routine purge pass.
//!
//! A purge pass walks every collection and deletes records at or below the
//! collection's compaction boundary. The boundary predicate is idempotent
//! and monotonic, so passes are safe to repeat, safe to stop mid-way, and
//! safe to run concurrently with boundary advances: a stale boundary read
//! only under-purges, never over-purges.

use std::sync::Arc;

use tracing::{debug, info, warn};

use shale_log::{Error as LogError, LogStore};

use crate::error::Result;
use crate::metrics::PurgeTimer;

/// Outcome of one purge pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeRun {
    /// Collections visited before the pass ended.
    pub collections_scanned: u64,
    /// Records deleted across all visited collections.
    pub records_purged: u64,
    /// Whether the pass stopped early at a cancellation checkpoint.
    pub stopped_early: bool,
    /// Per-collection failures as `collection_id: error` strings.
    pub errors: Vec<String>,
}

impl PurgeRun {
    /// Returns true if any collection failed to purge.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Deletes compacted records across all collections.
pub struct Purger {
    store: Arc<dyn LogStore>,
}

impl Purger {
    /// Creates a purger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Runs one purge pass over every collection.
    ///
    /// `keep_going` is the cancellation checkpoint, consulted between
    /// collections; when it turns false (leadership lost, shutdown) the pass
    /// stops there and reports `stopped_early`. A per-collection failure is
    /// recorded in `errors` and the pass continues with the remaining
    /// collections. Collections dropped while the pass is running are
    /// skipped silently.
    ///
    /// # Errors
    ///
    /// Returns an error only if the collection listing itself fails; nothing
    /// has been purged in that case.
    pub async fn run(&self, keep_going: impl Fn() -> bool + Send) -> Result<PurgeRun> {
        let timer = PurgeTimer::start();
        let snapshots = match self.store.list_collections().await {
            Ok(snapshots) => snapshots,
            Err(error) => {
                crate::metrics::record_purge_error();
                return Err(error.into());
            }
        };

        let mut run = PurgeRun::default();
        for snapshot in snapshots {
            if !keep_going() {
                info!(
                    collections_scanned = run.collections_scanned,
                    "purge pass stopped at checkpoint"
                );
                run.stopped_early = true;
                break;
            }

            run.collections_scanned += 1;
            match self.store.purge_compacted(snapshot.collection_id).await {
                Ok(purged) => run.records_purged += purged,
                Err(LogError::CollectionNotFound { .. }) => {
                    debug!(
                        collection_id = %snapshot.collection_id,
                        "collection dropped mid-pass"
                    );
                }
                Err(error) => {
                    warn!(
                        collection_id = %snapshot.collection_id,
                        error = %error,
                        "purge failed for collection"
                    );
                    crate::metrics::record_purge_error();
                    run.errors
                        .push(format!("{}: {error}", snapshot.collection_id));
                }
            }
        }

        timer.finish(run.records_purged);
        info!(
            collections_scanned = run.collections_scanned,
            records_purged = run.records_purged,
            errors = run.errors.len(),
            "purge pass finished"
        );
        Ok(run)
    }
}
