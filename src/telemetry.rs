//! Logging and metric descriptions.

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "content_tracker=info,warn";

/// One-time metrics registration, so series show up once a recorder exists.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_cycles_total", "Check cycles run to completion or abort.");
        describe_counter!(
            "tracker_cycles_rejected_total",
            "Triggers rejected because a cycle was already running."
        );
        describe_counter!(
            "tracker_items_processed_total",
            "Items analyzed and stored."
        );
        describe_counter!(
            "tracker_errors_total",
            "Per-source and per-item errors recorded in run reports."
        );
        describe_counter!(
            "tracker_sources_skipped_total",
            "Sources skipped as not found/private."
        );
        describe_counter!(
            "collector_retries_total",
            "Transient collector failures that were retried."
        );
        describe_counter!(
            "enrich_bypass_total",
            "Short inputs answered without calling the analyzer."
        );
        describe_counter!(
            "enrich_failures_total",
            "Enrichment failures (no content, empty or unparseable response, analyzer error)."
        );
        describe_counter!("store_records_written_total", "Records written to disk.");
        describe_gauge!(
            "tracker_last_cycle_ts",
            "Unix ts when the last check cycle started."
        );
    });
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
