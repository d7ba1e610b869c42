//! Deep garbage collection.
//!
//! Garbage collection is the janitor's slow pass, run once at process start
//! and then on a long interval. It goes further than the routine purge:
//!
//! 1. `purge` - the same boundary predicate as the routine pass
//! 2. `orphaned_collections` - drops log state whose collection no longer
//!    exists in the external catalog (the deletion cascade missed it)
//! 3. `vacuum` - storage-level reclamation
//!
//! Phases are isolated: a failing phase is recorded in the outcome and the
//! remaining phases still run.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use shale_core::CollectionId;
use shale_log::{CatalogView, Error as LogError, LogStore};

use crate::error::Result;
use crate::purge::Purger;

/// Result of a garbage-collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcOutcome {
    /// Records deleted by the purge phase.
    pub records_purged: u64,
    /// Orphaned collections dropped.
    pub collections_dropped: u64,
    /// Implementation-defined storage units reclaimed by `vacuum`.
    pub storage_reclaimed: u64,
    /// Failures encountered (the pass continues on non-fatal errors).
    pub errors: Vec<String>,
}

impl GcOutcome {
    /// Merges another outcome into this one.
    pub fn merge(&mut self, other: Self) {
        self.records_purged += other.records_purged;
        self.collections_dropped += other.collections_dropped;
        self.storage_reclaimed += other.storage_reclaimed;
        self.errors.extend(other.errors);
    }

    /// Returns true if any phase or collection failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Dry-run report showing what a pass would reclaim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcPlan {
    /// Live records at or below their collection's compaction boundary.
    pub purgeable_records: u64,
    /// Collections whose catalog entry is gone.
    pub orphaned_collections: Vec<CollectionId>,
}

/// Phased garbage collector over the log store and catalog view.
///
/// # Example
///
/// ```rust,ignore
/// let gc = GarbageCollector::new(store, catalog);
///
/// // Dry run first
/// let plan = gc.collect_dry_run().await?;
///
/// // Actually collect
/// let outcome = gc.collect(|| true).await;
/// ```
pub struct GarbageCollector {
    store: Arc<dyn LogStore>,
    catalog: Arc<dyn CatalogView>,
    purger: Purger,
}

impl GarbageCollector {
    /// Creates a collector over the given store and catalog view.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>, catalog: Arc<dyn CatalogView>) -> Self {
        let purger = Purger::new(Arc::clone(&store));
        Self {
            store,
            catalog,
            purger,
        }
    }

    /// Runs a full garbage-collection pass.
    ///
    /// `keep_going` is consulted at phase boundaries and between collections
    /// inside the iterative phases; when it turns false the pass winds down
    /// at the next checkpoint. Failures never abort the pass: they are
    /// collected in the outcome's `errors`.
    pub async fn collect(&self, keep_going: impl Fn() -> bool + Send + Sync) -> GcOutcome {
        let start = Instant::now();
        let mut outcome = GcOutcome::default();

        tracing::info!(
            metric = "shale_janitor_gc_run_started",
            "starting garbage collection"
        );

        Self::run_phase("purge", || self.purge_phase(&keep_going), &mut outcome).await;
        Self::run_phase(
            "orphaned_collections",
            || self.orphan_phase(&keep_going),
            &mut outcome,
        )
        .await;
        Self::run_phase("vacuum", || self.vacuum_phase(&keep_going), &mut outcome).await;

        crate::metrics::record_gc_pass(outcome.collections_dropped);
        tracing::info!(
            records_purged = outcome.records_purged,
            collections_dropped = outcome.collections_dropped,
            storage_reclaimed = outcome.storage_reclaimed,
            errors_count = outcome.errors.len(),
            duration_secs = start.elapsed().as_secs_f64(),
            metric = "shale_janitor_gc_run_completed",
            "garbage collection completed"
        );

        outcome
    }

    /// Reports what a pass would reclaim without deleting anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or catalog cannot be read.
    pub async fn collect_dry_run(&self) -> Result<GcPlan> {
        let mut plan = GcPlan::default();

        let snapshots = self.store.list_collections().await?;
        for snapshot in snapshots {
            let boundary = snapshot.compaction_offset;
            if boundary > 0 {
                // Survivors come back ascending, so the purgeable ones (at
                // or below the boundary) are a prefix of at most `boundary`
                // records.
                let limit = usize::try_from(boundary).unwrap_or(usize::MAX);
                let records = match self
                    .store
                    .get_records(snapshot.collection_id, 1, limit, Utc::now())
                    .await
                {
                    Ok(records) => records,
                    Err(LogError::CollectionNotFound { .. }) => continue,
                    Err(error) => return Err(error.into()),
                };
                plan.purgeable_records +=
                    records.iter().filter(|r| r.offset <= boundary).count() as u64;
            }

            if !self
                .catalog
                .collection_exists(snapshot.collection_id)
                .await?
            {
                plan.orphaned_collections.push(snapshot.collection_id);
            }
        }

        Ok(plan)
    }

    async fn run_phase<F, Fut>(phase: &'static str, f: F, outcome: &mut GcOutcome)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GcOutcome>>,
    {
        let phase_start = Instant::now();
        match f().await {
            Ok(phase_outcome) => {
                let duration_secs = phase_start.elapsed().as_secs_f64();
                tracing::info!(
                    phase,
                    records_purged = phase_outcome.records_purged,
                    collections_dropped = phase_outcome.collections_dropped,
                    storage_reclaimed = phase_outcome.storage_reclaimed,
                    duration_secs,
                    metric = "shale_janitor_gc_phase_completed",
                    "GC phase completed"
                );

                crate::metrics::record_gc_phase(phase, duration_secs);

                outcome.merge(phase_outcome);
            }
            Err(e) => {
                tracing::error!(
                    phase,
                    error = %e,
                    metric = "shale_janitor_gc_errors_total",
                    "GC phase failed"
                );

                crate::metrics::record_gc_error(phase);

                outcome.errors.push(format!("{phase}: {e}"));
            }
        }
    }

    async fn purge_phase(
        &self,
        keep_going: &(impl Fn() -> bool + Send + Sync),
    ) -> Result<GcOutcome> {
        let run = self.purger.run(|| keep_going()).await?;
        Ok(GcOutcome {
            records_purged: run.records_purged,
            errors: run.errors,
            ..GcOutcome::default()
        })
    }

    async fn orphan_phase(
        &self,
        keep_going: &(impl Fn() -> bool + Send + Sync),
    ) -> Result<GcOutcome> {
        let mut outcome = GcOutcome::default();

        let snapshots = self.store.list_collections().await?;
        for snapshot in snapshots {
            if !keep_going() {
                tracing::debug!("orphan sweep stopped at checkpoint");
                break;
            }

            let collection_id = snapshot.collection_id;
            match self.catalog.collection_exists(collection_id).await {
                Ok(true) => {}
                Ok(false) => match self.store.drop_collection(collection_id).await {
                    Ok(true) => {
                        outcome.collections_dropped += 1;
                        tracing::info!(
                            collection_id = %collection_id,
                            "dropped orphaned collection log"
                        );
                    }
                    Ok(false) => {}
                    Err(error) => outcome.errors.push(format!("{collection_id}: {error}")),
                },
                // Without a catalog answer we must assume the collection is
                // live and leave it alone.
                Err(error) => outcome.errors.push(format!("{collection_id}: {error}")),
            }
        }

        Ok(outcome)
    }

    async fn vacuum_phase(
        &self,
        keep_going: &(impl Fn() -> bool + Send + Sync),
    ) -> Result<GcOutcome> {
        if !keep_going() {
            return Ok(GcOutcome::default());
        }

        let storage_reclaimed = self.store.vacuum().await?;
        Ok(GcOutcome {
            storage_reclaimed,
            ..GcOutcome::default()
        })
    }
}
