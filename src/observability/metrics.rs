//! Metrics collection and exposition.
//!
//! # Metrics
//! - `control_plane_sync_events_total` (counter): events handled, by operation
//! - `control_plane_parse_failures_total` (counter): rejected documents
//! - `control_plane_publish_total` (counter): publication attempts, by outcome
//! - `control_plane_snapshot_version` (gauge): version currently served
//! - `control_plane_fragments` (gauge): fragments in the store
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_sync_event(operation: &'static str) {
    counter!("control_plane_sync_events_total", "operation" => operation).increment(1);
}

pub fn record_parse_failure() {
    counter!("control_plane_parse_failures_total").increment(1);
}

pub fn record_publish(outcome: &'static str) {
    counter!("control_plane_publish_total", "outcome" => outcome).increment(1);
}

pub fn record_snapshot_version(version: u64) {
    gauge!("control_plane_snapshot_version").set(version as f64);
}

pub fn record_fragment_count(count: usize) {
    gauge!("control_plane_fragments").set(count as f64);
}
