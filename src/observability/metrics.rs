//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tap_proxy_upstream_requests_total` (counter): upstream HTTP calls by status
//! - `tap_proxy_upstream_request_duration_seconds` (histogram): upstream latency
//! - `tap_proxy_bridge_sessions_active` (gauge): open bridge sessions
//! - `tap_proxy_bridge_sessions_total` (counter): finished sessions by outcome
//! - `tap_proxy_bridge_messages_relayed_total` (counter): upstream frames forwarded
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one upstream HTTP call. `status` is "error" for transport failures.
pub fn record_upstream_request(status: &str, start: Instant) {
    counter!("tap_proxy_upstream_requests_total", "status" => status.to_string()).increment(1);
    histogram!("tap_proxy_upstream_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_session_opened() {
    gauge!("tap_proxy_bridge_sessions_active").increment(1.0);
}

pub fn record_session_closed(outcome: &'static str) {
    gauge!("tap_proxy_bridge_sessions_active").decrement(1.0);
    counter!("tap_proxy_bridge_sessions_total", "outcome" => outcome).increment(1);
}

pub fn record_message_relayed() {
    counter!("tap_proxy_bridge_messages_relayed_total").increment(1);
}
