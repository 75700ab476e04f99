//! Prometheus metrics for the bridge relay
//!
//! Exposed on the `/metrics` endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, Encoder, Gauge,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP surface
    pub static ref HTTP_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "bridge_relay_http_requests_total",
        "Total number of HTTP requests handled",
        &["endpoint", "status"]
    ).unwrap();

    // Chain submissions
    pub static ref BROADCASTS: IntCounterVec = register_int_counter_vec!(
        "bridge_relay_broadcasts_total",
        "Total number of transaction batches submitted",
        &["operation", "status"]
    ).unwrap();

    pub static ref BROADCAST_LATENCY: HistogramVec = register_histogram_vec!(
        "bridge_relay_broadcast_latency_seconds",
        "Time from lock acquisition to broadcast result",
        &["operation"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    pub static ref FAILED_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "bridge_relay_failed_attempts_total",
        "Failed attempts of retried chain calls",
        &["operation", "kind"]
    ).unwrap();

    // Health
    pub static ref UP: Gauge = register_gauge!(
        "bridge_relay_up",
        "Whether the relay HTTP server is up (1 = up)"
    ).unwrap();
}

/// Encode every registered metric in the Prometheus text format
pub fn encode() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}
