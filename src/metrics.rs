//! Prometheus metrics for the request gate, the route rate limiter and the
//! AI tool routes.
//!
//! Metrics are exposed via a dedicated HTTP listener (default `0.0.0.0:9090`).
//! Recording functions are no-ops until [`init_metrics`] installs a recorder,
//! so tests can call them freely.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gate_violations_total` - Violations raised by the gate (labels: kind, severity)
//! - `gate_rejections_total` - Requests the gate answered with 403 (labels: reason)
//! - `rate_limit_rejections_total` - Requests refused by the route limiter (labels: route)
//! - `tool_requests_total` - Completed tool requests (labels: route, status)
//!
//! ## Histograms
//! - `ai_request_duration_seconds` - Latency of AI provider calls (labels: route, outcome)
//!
//! ## Gauges
//! - `gate_blocked_addresses` - Current size of the blocked address set

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const GATE_VIOLATIONS_TOTAL: &str = "gate_violations_total";
    pub const GATE_REJECTIONS_TOTAL: &str = "gate_rejections_total";
    pub const GATE_BLOCKED_ADDRESSES: &str = "gate_blocked_addresses";
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "rate_limit_rejections_total";
    pub const AI_REQUEST_DURATION_SECONDS: &str = "ai_request_duration_seconds";
    pub const TOOL_REQUESTS_TOTAL: &str = "tool_requests_total";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::GATE_VIOLATIONS_TOTAL,
        "Total number of security violations raised by the request gate"
    );
    describe_counter!(
        names::GATE_REJECTIONS_TOTAL,
        "Total number of requests rejected by the request gate"
    );
    describe_counter!(
        names::RATE_LIMIT_REJECTIONS_TOTAL,
        "Total number of requests refused by the per-route rate limiter"
    );
    describe_counter!(
        names::TOOL_REQUESTS_TOTAL,
        "Total number of completed career tool requests"
    );
    describe_histogram!(
        names::AI_REQUEST_DURATION_SECONDS,
        "AI provider call duration in seconds"
    );
    describe_gauge!(
        names::GATE_BLOCKED_ADDRESSES,
        "Number of client addresses currently blocked"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_gate_violation(kind: &'static str, severity: &'static str) {
    counter!(names::GATE_VIOLATIONS_TOTAL, "kind" => kind, "severity" => severity).increment(1);
}

pub fn record_gate_rejection(reason: &'static str) {
    counter!(names::GATE_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

pub fn record_rate_limit_rejection(route: &str) {
    counter!(names::RATE_LIMIT_REJECTIONS_TOTAL, "route" => route.to_string()).increment(1);
}

pub fn record_tool_request(route: &str, status: u16) {
    counter!(
        names::TOOL_REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record AI call latency. `outcome` is `"success"` or an error label.
pub fn record_ai_duration(route: &str, outcome: &'static str, duration_secs: f64) {
    histogram!(
        names::AI_REQUEST_DURATION_SECONDS,
        "route" => route.to_string(),
        "outcome" => outcome
    )
    .record(duration_secs);
}

#[allow(clippy::cast_precision_loss)]
pub fn set_blocked_addresses(count: usize) {
    gauge!(names::GATE_BLOCKED_ADDRESSES).set(count as f64);
}
