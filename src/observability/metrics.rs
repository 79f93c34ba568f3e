//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method
//! - `edge_request_duration_seconds` (histogram): time to produce the redirect
//! - `edge_redirects_total` (counter): redirects by matched rule
//! - `edge_traffic_logs_total` (counter): log writes by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, start: Instant) {
    counter!("edge_requests_total", "method" => method.to_string()).increment(1);
    histogram!("edge_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_redirect(rule: &'static str) {
    counter!("edge_redirects_total", "rule" => rule).increment(1);
}

/// `outcome` is one of `written`, `failed`, `skipped`.
pub fn record_traffic_log(outcome: &'static str) {
    counter!("edge_traffic_logs_total", "outcome" => outcome).increment(1);
}
