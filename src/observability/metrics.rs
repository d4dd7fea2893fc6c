//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lifecycle and discovery metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `discovery_operations_total` (counter): backend calls by backend, operation, outcome
//! - `discovery_operation_duration_seconds` (histogram): backend call latency
//! - `lifecycle_phase` (gauge): numeric phase of the orchestrator
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests and the CLI
//!   never need to opt out
//! - Labels are static strings; no per-record cardinality

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one discovery backend call.
pub fn record_discovery_operation(backend: &'static str, operation: &'static str, outcome: &'static str, start: Instant) {
    counter!(
        "discovery_operations_total",
        "backend" => backend,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        "discovery_operation_duration_seconds",
        "backend" => backend,
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64());
}

/// Export the current lifecycle phase.
pub fn record_phase(phase: u8) {
    gauge!("lifecycle_phase").set(f64::from(phase));
}
