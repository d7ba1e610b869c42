//! Observability infrastructure for shale.
//!
//! Structured logging with consistent spans across all shale components.
//! This module provides initialization helpers and span constructors so the
//! store and janitor emit uniformly queryable events.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `shale_log=debug`)
///
/// # Example
///
/// ```rust
/// use shale_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for record store operations with standard fields.
///
/// # Example
///
/// ```rust
/// use shale_core::observability::store_span;
///
/// let span = store_span("insert_records", "01J9ZXKQ4N3T5V8W2Y6B0DAF1C");
/// let _guard = span.enter();
/// // ... do store operation
/// ```
#[must_use]
pub fn store_span(operation: &str, collection: &str) -> Span {
    tracing::info_span!(
        "store",
        op = operation,
        collection = collection,
    )
}

/// Creates a span for janitor operations.
///
/// # Example
///
/// ```rust
/// use shale_core::observability::janitor_span;
///
/// let span = janitor_span("purge", "instance-1");
/// let _guard = span.enter();
/// // ... do janitor operation
/// ```
#[must_use]
pub fn janitor_span(operation: &str, instance: &str) -> Span {
    tracing::info_span!(
        "janitor",
        op = operation,
        instance = instance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_succeeds() {
        // Should not panic (uses Once internally)
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn test_store_span_creates_span() {
        let span = store_span("insert_records", "collection-1");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }

    #[test]
    fn test_janitor_span_creates_span() {
        let span = janitor_span("purge", "instance-1");
        let _guard = span.enter();
        tracing::info!("janitor message");
    }
}
