//! # shale-janitor
//!
//! Maintenance service for the Shale shared log.
//!
//! Producers append to per-collection logs and a downstream compactor folds
//! records into durable segments, advancing each collection's compaction
//! boundary as it goes. The janitor is the process that cleans up behind
//! that pipeline:
//!
//! - **Purge**: routinely deletes records at or below the compaction
//!   boundary, keeping log storage bounded
//! - **Garbage collection**: a deeper periodic pass that also drops log
//!   state for collections deleted from the catalog and vacuums storage
//! - **Backlog reporting**: publishes the compaction backlog gauge
//! - **Leader election**: lease-based, so exactly one instance does the
//!   deletion work while the rest stand by
//!
//! ## Guarantees
//!
//! - **Boundary-safe**: nothing above a collection's compaction boundary is
//!   ever deleted, so readers and the compactor never lose unfolded records
//! - **Single writer**: purge and GC run only on the elected leader; losing
//!   the lease stops the work at the next checkpoint
//! - **Crash-only**: every pass is idempotent, so a janitor that dies
//!   mid-pass leaves nothing to repair
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use shale_janitor::prelude::*;
//! use shale_log::{CatalogView, InMemoryCatalog, InMemoryLogStore, LogStore};
//!
//! # #[tokio::main]
//! # async fn main() -> shale_janitor::error::Result<()> {
//! let store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
//! let catalog: Arc<dyn CatalogView> = Arc::new(InMemoryCatalog::new());
//!
//! // Routine purge pass.
//! let purger = Purger::new(Arc::clone(&store));
//! let run = purger.run(|| true).await?;
//! println!("purged {} records", run.records_purged);
//!
//! // Deep pass: purge, orphan sweep, vacuum.
//! let gc = GarbageCollector::new(store, catalog);
//! let outcome = gc.collect(|| true).await;
//! println!("dropped {} orphaned collections", outcome.collections_dropped);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod gc;
pub mod leader;
pub mod metrics;
pub mod purge;
pub mod reporter;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::JanitorConfig;
    pub use crate::error::{Error, Result};
    pub use crate::gc::{GarbageCollector, GcOutcome, GcPlan};
    pub use crate::leader::{
        InMemoryLeaderElector, LeaderElector, LeaderStatus, LeadershipCampaign, LeadershipResult,
        LeaseSettings, RenewalResult,
    };
    pub use crate::purge::{PurgeRun, Purger};
    pub use crate::reporter::BacklogReporter;
}
