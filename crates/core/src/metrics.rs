//! Metrics definitions for the ledger engine.
//!
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "pages_fetched_total",
        "Total number of transfer pages fetched successfully"
    );
    describe_counter!(
        "transfer_events_fetched_total",
        "Total number of raw transfer events received"
    );
    describe_counter!(
        "page_fetch_retries_total",
        "Total number of page or balance fetches retried after a transient failure"
    );
    describe_counter!(
        "fetches_cancelled_total",
        "Total number of transfer streams stopped by cancellation"
    );
    describe_counter!(
        "transfers_grouped_total",
        "Total number of grouped transactions produced"
    );
    describe_histogram!(
        "fetch_duration_seconds",
        "Time taken by one fetch-to-display cycle in seconds"
    );
}

/// Record a successfully fetched page.
pub fn record_page_fetched(events: usize) {
    counter!("pages_fetched_total").increment(1);
    counter!("transfer_events_fetched_total").increment(events as u64);
}

/// Record a retried request.
///
/// # Arguments
/// * `reason` - Failure kind ("timeout" or "transport")
pub fn record_page_retry(reason: &str) {
    counter!("page_fetch_retries_total", "reason" => reason.to_string()).increment(1);
}

/// Record a stream stopped by its cancellation flag.
pub fn record_fetch_cancelled() {
    counter!("fetches_cancelled_total").increment(1);
}

/// Record the number of grouped transactions built in one cycle.
pub fn record_transfers_grouped(count: usize) {
    counter!("transfers_grouped_total").increment(count as u64);
}

/// Record fetch cycle duration.
pub fn record_fetch_duration(duration_secs: f64) {
    histogram!("fetch_duration_seconds").record(duration_secs);
}

/// A timer that records the cycle duration when dropped.
pub struct FetchTimer {
    start: Instant,
}

impl FetchTimer {
    /// Start a new fetch timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for FetchTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        record_fetch_duration(self.start.elapsed().as_secs_f64());
    }
}
