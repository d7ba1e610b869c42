//! Backlog gauge publishing.

use std::sync::Arc;

use shale_log::LogStore;

use crate::error::Result;

/// Samples the store's compaction backlog and publishes it as a gauge.
///
/// The backlog is the total number of records past the compaction boundary
/// across all collections, the amount of work waiting on the downstream
/// compactor. The leader samples it on a short interval so the gauge stays
/// near-real-time without every instance hammering the store.
pub struct BacklogReporter {
    store: Arc<dyn LogStore>,
}

impl BacklogReporter {
    /// Creates a reporter over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Samples the backlog once, publishes the gauge, and returns the depth.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. The gauge keeps its
    /// previous value in that case.
    pub async fn sample_once(&self) -> Result<u64> {
        let depth = self.store.backlog_depth().await?;

        shale_log::metrics::set_backlog_depth(depth);
        tracing::trace!(backlog_records = depth, "sampled compaction backlog");

        Ok(depth)
    }
}
