//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all DocForge metrics
pub const METRICS_PREFIX: &str = "docforge";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents ingested"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks persisted"
    );

    describe_counter!(
        format!("{}_chunks_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks dropped after a failed insert"
    );

    describe_histogram!(
        format!("{}_ingest_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document ingestion latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record the outcome of a single document ingestion
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, chunks_skipped: usize) {
    counter!(format!("{}_documents_ingested_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_chunks_created_total", METRICS_PREFIX))
        .increment(chunks_created as u64);

    if chunks_skipped > 0 {
        counter!(format!("{}_chunks_skipped_total", METRICS_PREFIX))
            .increment(chunks_skipped as u64);
    }

    histogram!(format!("{}_ingest_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
