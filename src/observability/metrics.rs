//! Metrics collection and exposition.
//!
//! # Metrics
//! - `acp_polls_total` (counter): fetch cycles by result
//! - `acp_policies_active` (gauge): policies in the last accepted set
//! - `acp_auth_requests_total` (counter): auth decisions by status code

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

/// Record the outcome of one fetch cycle.
pub fn record_poll(success: bool) {
    let result = if success { "ok" } else { "error" };
    metrics::counter!("acp_polls_total", "result" => result).increment(1);
}

/// Record the size of the last accepted policy set.
pub fn record_policy_count(count: usize) {
    metrics::gauge!("acp_policies_active").set(count as f64);
}

/// Record one auth decision by response status.
pub fn record_auth_request(status: u16) {
    metrics::counter!("acp_auth_requests_total", "status" => status.to_string()).increment(1);
}
