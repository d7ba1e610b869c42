//! Metric names and recording helpers for the record log.
//!
//! All metrics use the `shale_log_` prefix. Recording is a no-op until a
//! recorder is installed, so the store can emit unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Counter: total record batches appended.
pub const APPEND_BATCHES_TOTAL: &str = "shale_log_append_batches_total";

/// Counter: total records appended.
pub const APPEND_RECORDS_TOTAL: &str = "shale_log_append_records_total";

/// Counter: total records returned by reads.
pub const READ_RECORDS_TOTAL: &str = "shale_log_read_records_total";

/// Counter: total appends aborted because the claimed offset block was taken.
pub const OFFSET_CONFLICTS_TOTAL: &str = "shale_log_offset_conflicts_total";

/// Gauge: records above the compaction boundary across all collections.
pub const BACKLOG_RECORDS: &str = "shale_log_backlog_records";

/// Registers descriptions for all log metrics.
pub fn register_metrics() {
    describe_counter!(
        APPEND_BATCHES_TOTAL,
        "Total record batches appended to the log"
    );
    describe_counter!(APPEND_RECORDS_TOTAL, "Total records appended to the log");
    describe_counter!(READ_RECORDS_TOTAL, "Total records returned by log reads");
    describe_counter!(
        OFFSET_CONFLICTS_TOTAL,
        "Total appends aborted by an offset block conflict"
    );
    describe_gauge!(
        BACKLOG_RECORDS,
        "Records above the compaction boundary across all collections"
    );
}

/// Records an appended batch and its record count.
pub fn record_append(records: usize) {
    counter!(APPEND_BATCHES_TOTAL).increment(1);
    counter!(APPEND_RECORDS_TOTAL).increment(records as u64);
}

/// Records the number of records returned by a read.
pub fn record_read(records: usize) {
    counter!(READ_RECORDS_TOTAL).increment(records as u64);
}

/// Records an append aborted by an offset conflict.
pub fn record_offset_conflict() {
    counter!(OFFSET_CONFLICTS_TOTAL).increment(1);
}

/// Sets the backlog gauge to the current uncompacted record count.
#[allow(clippy::cast_precision_loss)]
pub fn set_backlog_depth(depth: u64) {
    gauge!(BACKLOG_RECORDS).set(depth as f64);
}
