//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define mock server metrics (requests, latency, reloads, rule count)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `mock_requests_total` (counter): requests by method, status, outcome
//! - `mock_request_duration_seconds` (histogram): latency distribution
//! - `mock_config_reloads_total` (counter): reload attempts by result
//! - `mock_rules` (gauge): rules in the published table
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Low-overhead metric updates (atomic operations)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    Static,
    NotFound,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Static => "static",
            Outcome::NotFound => "not_found",
            Outcome::Error => "error",
        }
    }
}

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    counter!(
        "mock_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("mock_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("mock_config_reloads_total", "result" => result).increment(1);
}

pub fn record_rule_count(rules: usize) {
    gauge!("mock_rules").set(rules as f64);
}
