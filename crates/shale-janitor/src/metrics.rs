//! Janitor metrics.
//!
//! Prometheus recorder setup plus the `shale_janitor_` metric family:
//! purge pass duration and outcomes, GC phase outcomes, and the leadership
//! gauge. The log's own `shale_log_` metrics are described separately by
//! [`shale_log::metrics::register_metrics`].

use std::sync::OnceLock;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Purge pass duration in seconds.
pub const PURGE_DURATION: &str = "shale_janitor_purge_duration_seconds";

/// Records deleted by purge passes.
pub const PURGE_RECORDS_TOTAL: &str = "shale_janitor_purge_records_total";

/// Completed purge passes.
pub const PURGE_PASSES_TOTAL: &str = "shale_janitor_purge_passes_total";

/// Purge failures (whole-pass or per-collection).
pub const PURGE_ERRORS_TOTAL: &str = "shale_janitor_purge_errors_total";

/// Completed garbage-collection passes.
pub const GC_PASSES_TOTAL: &str = "shale_janitor_gc_passes_total";

/// Garbage-collection phase duration in seconds, labeled by phase.
pub const GC_PHASE_DURATION: &str = "shale_janitor_gc_phase_duration_seconds";

/// Garbage-collection phase failures, labeled by phase.
pub const GC_ERRORS_TOTAL: &str = "shale_janitor_gc_errors_total";

/// Orphaned collections dropped by garbage collection.
pub const GC_COLLECTIONS_DROPPED_TOTAL: &str = "shale_janitor_gc_collections_dropped_total";

/// Whether this instance currently holds janitor leadership (0 or 1).
pub const LEADER_STATE: &str = "shale_janitor_leader";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initializes the global metrics recorder with a Prometheus exporter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
///
/// # Panics
///
/// Panics if the Prometheus recorder cannot be installed. Metrics are part
/// of the janitor's operational contract and the service should not start
/// without them.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_histogram!(PURGE_DURATION, "Duration of purge passes in seconds");
            describe_counter!(PURGE_RECORDS_TOTAL, "Total records deleted by purge passes");
            describe_counter!(PURGE_PASSES_TOTAL, "Total purge passes completed");
            describe_counter!(PURGE_ERRORS_TOTAL, "Total purge failures");
            describe_counter!(GC_PASSES_TOTAL, "Total garbage-collection passes completed");
            describe_histogram!(
                GC_PHASE_DURATION,
                "Duration of garbage-collection phases in seconds"
            );
            describe_counter!(
                GC_ERRORS_TOTAL,
                "Total garbage-collection phase failures by phase"
            );
            describe_counter!(
                GC_COLLECTIONS_DROPPED_TOTAL,
                "Total orphaned collections dropped by garbage collection"
            );
            describe_gauge!(
                LEADER_STATE,
                "Whether this instance holds janitor leadership (0 or 1)"
            );

            tracing::info!("Prometheus metrics recorder initialized for janitor");
            handle
        })
        .clone()
}

/// Returns the global Prometheus handle, if initialized.
#[must_use]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Handler for the `/metrics` endpoint.
pub async fn serve_metrics() -> impl IntoResponse {
    match prometheus_handle() {
        Some(handle) => {
            let rendered = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; charset=utf-8")],
                rendered,
            )
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "text/plain; charset=utf-8")],
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Records a completed purge pass.
pub fn record_purge_pass(duration_secs: f64, records_purged: u64) {
    histogram!(PURGE_DURATION).record(duration_secs);
    counter!(PURGE_RECORDS_TOTAL).increment(records_purged);
    counter!(PURGE_PASSES_TOTAL).increment(1);
}

/// Records a purge failure.
pub fn record_purge_error() {
    counter!(PURGE_ERRORS_TOTAL).increment(1);
}

/// Records a completed garbage-collection pass.
pub fn record_gc_pass(collections_dropped: u64) {
    counter!(GC_PASSES_TOTAL).increment(1);
    counter!(GC_COLLECTIONS_DROPPED_TOTAL).increment(collections_dropped);
}

/// Records a completed garbage-collection phase.
pub fn record_gc_phase(phase: &str, duration_secs: f64) {
    histogram!(GC_PHASE_DURATION, "phase" => phase.to_string()).record(duration_secs);
}

/// Records a garbage-collection phase failure.
pub fn record_gc_error(phase: &str) {
    counter!(GC_ERRORS_TOTAL, "phase" => phase.to_string()).increment(1);
}

/// Updates the leadership gauge.
pub fn set_leader_state(leader: bool) {
    gauge!(LEADER_STATE).set(if leader { 1.0 } else { 0.0 });
}

/// RAII guard for measuring purge pass duration.
pub struct PurgeTimer {
    start: Instant,
}

impl PurgeTimer {
    /// Starts timing a purge pass.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stops the timer and records the pass.
    pub fn finish(self, records_purged: u64) {
        let duration = self.start.elapsed().as_secs_f64();
        record_purge_pass(duration, records_purged);

        tracing::debug!(
            duration_secs = %duration,
            records_purged = %records_purged,
            "recorded purge metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_metrics_is_idempotent() {
        let first = init_metrics();
        let second = init_metrics();

        drop((first, second));
        assert!(prometheus_handle().is_some());
    }

    #[test]
    fn recording_is_safe_after_init() {
        init_metrics();

        let timer = PurgeTimer::start();
        timer.finish(3);
        record_purge_error();
        record_gc_pass(1);
        record_gc_phase("purge", 0.01);
        record_gc_error("vacuum");
        set_leader_state(true);

        let rendered = prometheus_handle().expect("handle").render();
        assert!(rendered.contains("shale_janitor_purge_passes_total"));
    }
}
