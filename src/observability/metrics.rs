//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_operations_total` (counter): facade operations by operation, outcome
//! - `ledger_submissions_total` (counter): broadcast transactions by operation
//! - `ledger_confirmation_seconds` (histogram): submit-to-finality latency
//! - `ledger_unresolved_transactions` (gauge): timed-out or cancelled waits awaiting reconciliation
//! - `ledger_backend_health` (gauge): 1=healthy, 0=unhealthy

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the result of one facade operation.
pub fn record_operation(operation: &'static str, outcome: &'static str) {
    counter!("ledger_operations_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_submission(operation: &'static str) {
    counter!("ledger_submissions_total", "operation" => operation).increment(1);
}

pub fn record_confirmation_latency(operation: &'static str, elapsed: Duration) {
    histogram!("ledger_confirmation_seconds", "operation" => operation).record(elapsed.as_secs_f64());
}

pub fn record_unresolved(count: usize) {
    gauge!("ledger_unresolved_transactions").set(count as f64);
}

pub fn record_backend_health(backend: &'static str, healthy: bool) {
    gauge!("ledger_backend_health", "backend" => backend).set(if healthy { 1.0 } else { 0.0 });
}
