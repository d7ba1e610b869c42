//! # shale-janitor
//!
//! Maintenance daemon for the Shale shared log.
//!
//! The janitor purges records the compactor has folded into durable
//! segments, garbage-collects log state for deleted collections, and
//! publishes the compaction backlog gauge. Instances elect a leader over a
//! shared lease so exactly one of them does the deletion work.
//!
//! ## Modes
//!
//! - **Service Mode**: Runs continuously with HTTP health endpoints
//! - **CLI Mode**: Manual purge or garbage collection for debugging or
//!   recovery
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Shallow liveness check (always 200)
//! - `GET /ready` - Readiness check with purge health status
//!
//! ## Usage
//!
//! ```bash
//! # Run as service (default)
//! shale-janitor serve --port 8080
//!
//! # Manual purge pass
//! shale-janitor purge
//!
//! # Manual garbage collection
//! shale-janitor gc
//!
//! # Dry run
//! shale-janitor gc --dry-run
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use shale_core::observability::{LogFormat, init_logging};
use shale_janitor::config::JanitorConfig;
use shale_janitor::gc::GarbageCollector;
use shale_janitor::leader::{
    InMemoryLeaderElector, LeaderElector, LeaderStatus, LeadershipCampaign,
};
use shale_janitor::metrics;
use shale_janitor::purge::Purger;
use shale_janitor::reporter::BacklogReporter;
use shale_log::{CatalogView, InMemoryCatalog, InMemoryLogStore, LogStore};

// ============================================================================
// CLI Arguments
// ============================================================================

/// Shale log janitor.
#[derive(Debug, Parser)]
#[command(name = "shale-janitor")]
#[command(about = "Purges compacted records and garbage-collects the shared log")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run as a service with health endpoints.
    Serve {
        /// HTTP port for health and trigger endpoints.
        #[arg(long, env = "SHALE_JANITOR_PORT", default_value = "8080")]
        port: u16,
    },

    /// Run a single purge pass.
    Purge,

    /// Run a single garbage-collection pass.
    Gc {
        /// Report what would be reclaimed without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
}

// ============================================================================
// Health State
// ============================================================================

/// Shared state for tracking purge health.
#[derive(Debug)]
struct JanitorState {
    /// Whether the service is ready to accept work.
    ready: AtomicBool,
    /// Unix timestamp of last successful purge pass.
    last_successful_purge_ts: AtomicU64,
    /// Total successful purge passes.
    successful_purges: AtomicU64,
    /// Total failed purge passes.
    failed_purges: AtomicU64,
    /// Whether a purge pass is currently running.
    purge_in_progress: AtomicBool,
    /// Serializes purge passes to avoid concurrent runs.
    purge_lock: Mutex<()>,
    /// Threshold (seconds) before marking unhealthy.
    unhealthy_threshold_secs: u64,
}

impl JanitorState {
    fn new(unhealthy_threshold_secs: u64) -> Self {
        Self {
            ready: AtomicBool::new(false),
            last_successful_purge_ts: AtomicU64::new(0),
            successful_purges: AtomicU64::new(0),
            failed_purges: AtomicU64::new(0),
            purge_in_progress: AtomicBool::new(false),
            purge_lock: Mutex::new(()),
            unhealthy_threshold_secs,
        }
    }

    fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    fn record_success(&self) {
        let now: u64 = Utc::now().timestamp().try_into().unwrap_or_default();
        self.last_successful_purge_ts.store(now, Ordering::Release);
        self.successful_purges.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed_purges.fetch_add(1, Ordering::Relaxed);
    }

    fn is_healthy(&self, leading: bool) -> bool {
        if !self.ready.load(Ordering::Acquire) {
            return false;
        }

        // Followers do no deletion work, so the purge recency gates below
        // only apply to the leader.
        if !leading {
            return true;
        }

        if self.successful_purges.load(Ordering::Acquire) == 0 {
            // Not healthy until the first successful purge pass completes.
            return false;
        }

        let last = self.last_successful_purge_ts.load(Ordering::Acquire);
        if last == 0 {
            return false;
        }

        let now: u64 = Utc::now().timestamp().try_into().unwrap_or_default();
        let elapsed = now.saturating_sub(last);
        elapsed < self.unhealthy_threshold_secs
    }

    fn last_successful_purge(&self) -> Option<DateTime<Utc>> {
        let ts = self.last_successful_purge_ts.load(Ordering::Acquire);
        if ts == 0 {
            None
        } else {
            let ts = i64::try_from(ts).ok()?;
            DateTime::from_timestamp(ts, 0)
        }
    }
}

/// Shared state for HTTP handlers.
#[derive(Clone)]
struct ServiceState {
    janitor: Arc<JanitorState>,
    status: LeaderStatus,
    purger: Arc<Purger>,
}

// ============================================================================
// Health Endpoints
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
struct ReadyResponse {
    ready: bool,
    healthy: bool,
    leader: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_successful_purge: Option<String>,
    successful_purges: u64,
    failed_purges: u64,
    purge_in_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// GET /health - Shallow liveness check.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Readiness check with purge health.
async fn ready(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    let ready = state.janitor.ready.load(Ordering::Acquire);
    let leader = state.status.is_leader();
    let healthy = state.janitor.is_healthy(leader);
    let last_successful = state.janitor.last_successful_purge();
    let successful_purges = state.janitor.successful_purges.load(Ordering::Relaxed);
    let failed_purges = state.janitor.failed_purges.load(Ordering::Relaxed);
    let purge_in_progress = state.janitor.purge_in_progress.load(Ordering::Acquire);

    let message = if !ready {
        Some("Service starting up".to_string())
    } else if leader && successful_purges == 0 {
        Some("Waiting for first successful purge".to_string())
    } else if !healthy {
        Some(format!(
            "No successful purge in {} seconds",
            state.janitor.unhealthy_threshold_secs
        ))
    } else {
        None
    };

    let status = if ready && healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready,
            healthy,
            leader,
            last_successful_purge: last_successful.map(|dt| dt.to_rfc3339()),
            successful_purges,
            failed_purges,
            purge_in_progress,
            message,
        }),
    )
}

/// POST /purge - Trigger a purge pass on-demand.
///
/// The manual trigger runs on this instance whether or not it holds
/// leadership; the pass is idempotent and boundary-safe either way.
///
/// Returns:
/// - `202 Accepted` if a new purge pass was started
/// - `409 Conflict` if a purge pass is already in progress
async fn trigger_purge(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    if state
        .janitor
        .purge_in_progress
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "status": "already_running",
                "message": "Purge is already in progress"
            })),
        );
    }

    let janitor = Arc::clone(&state.janitor);
    let purger = Arc::clone(&state.purger);
    let status = state.status.clone();
    tokio::spawn(async move {
        run_purge_cycle_guarded(&janitor, &purger, &status, false).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "started",
            "message": "Purge triggered"
        })),
    )
}

// ============================================================================
// Background Loops
// ============================================================================

/// Runs the purge loop in service mode.
async fn run_purge_loop(
    state: Arc<JanitorState>,
    purger: Arc<Purger>,
    status: LeaderStatus,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval_timer = tokio::time::interval(interval);

    // Mark as ready after first tick (startup complete).
    //
    // Note: the first `tick()` completes immediately to align the interval.
    interval_timer.tick().await;
    state.mark_ready();
    tracing::info!("Janitor ready, starting purge loop");

    // Run a purge pass immediately on startup so readiness can become
    // healthy without waiting a full interval.
    if status.is_leader() {
        run_purge_cycle_guarded(&state, &purger, &status, true).await;
    }

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = shutdown.changed() => break,
        }

        if !status.is_leader() {
            tracing::debug!("Not the leader, skipping purge cycle");
            continue;
        }

        tracing::info!("Starting purge cycle");

        run_purge_cycle_guarded(&state, &purger, &status, true).await;
    }

    tracing::debug!("Purge loop stopped");
}

async fn run_purge_cycle_guarded(
    state: &Arc<JanitorState>,
    purger: &Purger,
    status: &LeaderStatus,
    leader_gated: bool,
) {
    let _guard = state.purge_lock.lock().await;

    // If this cycle was started by the periodic loop, `purge_in_progress` may
    // be false. If it was started by `/purge`, it is already true. Either way,
    // ensure it's true while work is running and reset it at the end.
    state.purge_in_progress.store(true, Ordering::Release);

    let status = status.clone();
    let result = purger
        .run(move || !leader_gated || status.is_leader())
        .await;

    match result {
        Ok(run) if !run.has_errors() => {
            state.record_success();
            tracing::info!(
                collections_scanned = run.collections_scanned,
                records_purged = run.records_purged,
                stopped_early = run.stopped_early,
                "Purge pass completed successfully"
            );
        }
        Ok(run) => {
            state.record_failure();
            tracing::error!(
                collections_scanned = run.collections_scanned,
                records_purged = run.records_purged,
                errors = run.errors.len(),
                "Purge pass completed with errors"
            );
        }
        Err(e) => {
            state.record_failure();
            tracing::error!(error = %e, "Purge pass failed");
        }
    }

    state.purge_in_progress.store(false, Ordering::Release);
}

/// Runs the garbage-collection loop in service mode.
///
/// One pass runs unconditionally at startup to finish work a janitor that
/// died mid-pass left behind; after that, passes are leader-gated.
async fn run_gc_loop(
    gc: Arc<GarbageCollector>,
    status: LeaderStatus,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Starting boot garbage collection");
    let outcome = gc.collect(|| true).await;
    if outcome.has_errors() {
        tracing::warn!(
            errors = outcome.errors.len(),
            "Boot garbage collection completed with errors"
        );
    }

    let mut interval_timer = tokio::time::interval(interval);
    interval_timer.tick().await;

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = shutdown.changed() => break,
        }

        if !status.is_leader() {
            tracing::debug!("Not the leader, skipping garbage collection");
            continue;
        }

        tracing::info!("Starting garbage-collection cycle");

        let leading = status.clone();
        let outcome = gc.collect(move || leading.is_leader()).await;
        if outcome.has_errors() {
            tracing::warn!(
                errors = outcome.errors.len(),
                "Garbage collection completed with errors"
            );
        }
    }

    tracing::debug!("Garbage-collection loop stopped");
}

/// Runs the backlog gauge loop in service mode.
async fn run_backlog_loop(
    reporter: BacklogReporter,
    status: LeaderStatus,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = shutdown.changed() => break,
        }

        if !status.is_leader() {
            continue;
        }

        if let Err(e) = reporter.sample_once().await {
            tracing::warn!(error = %e, "Backlog sample failed");
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Resolves a shutdown future for the HTTP server and fans the signal out to
/// the leadership campaign.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }

    tracing::info!("Shutdown signal received, stopping janitor");
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<()> {
    let args = Args::parse();

    let format = match args.command {
        Commands::Serve { .. } => LogFormat::Json,
        _ => LogFormat::Pretty,
    };
    init_logging(format);

    let config = JanitorConfig::from_env()?;

    // In-process backends stand in for the storage tier until a persistent
    // store is wired in.
    let store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
    let catalog: Arc<dyn CatalogView> = Arc::new(InMemoryCatalog::new());
    let elector: Arc<dyn LeaderElector> =
        Arc::new(InMemoryLeaderElector::new(config.lease.lease_duration));

    match args.command {
        Commands::Serve { port } => {
            // Initialize metrics before starting
            metrics::init_metrics();
            shale_log::metrics::register_metrics();

            tracing::info!(
                port = port,
                purge_interval_secs = config.purge_interval.as_secs(),
                gc_interval_secs = config.gc_interval.as_secs(),
                unhealthy_threshold_secs = config.unhealthy_threshold_secs,
                lock_key = %config.lock_key,
                instance_id = %config.instance_id,
                "Starting janitor service"
            );

            let (campaign, status) = LeadershipCampaign::new(
                Arc::clone(&elector),
                config.lock_key.clone(),
                config.instance_id.clone(),
                config.lease,
            )?;

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let campaign_handle = tokio::spawn(campaign.run(shutdown_rx));

            let janitor_state = Arc::new(JanitorState::new(config.unhealthy_threshold_secs));
            let purger = Arc::new(Purger::new(Arc::clone(&store)));
            let gc = Arc::new(GarbageCollector::new(
                Arc::clone(&store),
                Arc::clone(&catalog),
            ));
            let reporter = BacklogReporter::new(Arc::clone(&store));

            let state = Arc::new(ServiceState {
                janitor: Arc::clone(&janitor_state),
                status: status.clone(),
                purger: Arc::clone(&purger),
            });

            // Build HTTP router
            let router = Router::new()
                .route("/health", get(health))
                .route("/ready", get(ready))
                .route("/metrics", get(metrics::serve_metrics))
                .route("/purge", post(trigger_purge))
                .with_state(Arc::clone(&state));

            // Spawn maintenance loops
            let purge_state = Arc::clone(&janitor_state);
            let purge_status = status.clone();
            let purge_interval = config.purge_interval;
            let purge_shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move {
                run_purge_loop(
                    purge_state,
                    purger,
                    purge_status,
                    purge_interval,
                    purge_shutdown,
                )
                .await;
            });

            let gc_status = status.clone();
            let gc_interval = config.gc_interval;
            let gc_shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move {
                run_gc_loop(gc, gc_status, gc_interval, gc_shutdown).await;
            });

            let backlog_status = status.clone();
            let backlog_interval = config.backlog_interval;
            let backlog_shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move {
                run_backlog_loop(reporter, backlog_status, backlog_interval, backlog_shutdown)
                    .await;
            });

            // Start HTTP server
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!(address = %addr, "Starting janitor server");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(shutdown_tx))
                .await?;

            // Wait for the campaign to release its lease before exiting.
            if tokio::time::timeout(Duration::from_secs(5), campaign_handle)
                .await
                .is_err()
            {
                tracing::warn!("Leadership campaign did not stop in time");
            }
        }

        Commands::Purge => {
            tracing::info!("Starting manual purge");

            let purger = Purger::new(store);
            let run = purger.run(|| true).await?;

            tracing::info!(
                collections_scanned = run.collections_scanned,
                records_purged = run.records_purged,
                "Purge complete"
            );

            if run.has_errors() {
                for error in &run.errors {
                    tracing::error!(%error, "Purge error");
                }
                anyhow::bail!("purge completed with {} errors", run.errors.len());
            }
        }

        Commands::Gc { dry_run } => {
            tracing::info!(dry_run = dry_run, "Starting manual garbage collection");

            let gc = GarbageCollector::new(store, catalog);

            if dry_run {
                let plan = gc.collect_dry_run().await?;

                for collection_id in &plan.orphaned_collections {
                    tracing::info!(%collection_id, "Would drop orphaned collection");
                }
                tracing::info!(
                    purgeable_records = plan.purgeable_records,
                    orphaned_collections = plan.orphaned_collections.len(),
                    "Dry run complete - no changes made"
                );
            } else {
                let outcome = gc.collect(|| true).await;

                tracing::info!(
                    records_purged = outcome.records_purged,
                    collections_dropped = outcome.collections_dropped,
                    storage_reclaimed = outcome.storage_reclaimed,
                    "Garbage collection complete"
                );

                if outcome.has_errors() {
                    for error in &outcome.errors {
                        tracing::error!(%error, "GC error");
                    }
                    anyhow::bail!(
                        "garbage collection completed with {} errors",
                        outcome.errors.len()
                    );
                }
            }
        }
    }

    Ok(())
}
