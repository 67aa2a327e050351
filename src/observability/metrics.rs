//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): decisions by outcome and pattern
//! - `gatekeeper_decision_duration_seconds` (histogram): pipeline latency
//! - `gatekeeper_reloads_total` (counter): hot reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Unmatched paths are labelled `none` to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const DECISIONS_TOTAL: &str = "gatekeeper_decisions_total";
pub const DECISION_DURATION: &str = "gatekeeper_decision_duration_seconds";
pub const RELOADS_TOTAL: &str = "gatekeeper_reloads_total";

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one gatekeeper decision. `pattern` is `None` when no pattern matched.
pub fn record_decision(outcome: &'static str, pattern: Option<&str>, start: Instant) {
    let pattern = pattern.unwrap_or("none").to_string();
    counter!(DECISIONS_TOTAL, "outcome" => outcome, "pattern" => pattern).increment(1);
    histogram!(DECISION_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());
}

pub fn record_reload(applied: bool) {
    let result = if applied { "applied" } else { "misconfigured" };
    counter!(RELOADS_TOTAL, "result" => result).increment(1);
}
