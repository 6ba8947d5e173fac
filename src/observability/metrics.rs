//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (requests, latency, not-found, errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `kindling_requests_total` (counter): dispatches by context, status, exit
//! - `kindling_request_duration_seconds` (histogram): dispatch latency
//! - `kindling_not_found_total` (counter): dispatches ending in 404
//! - `kindling_errors_total` (counter): dispatches ending in an error page, by kind
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels limited to low-cardinality values (no paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(context: &'static str, status: u16, exit_code: u8, start: Instant) {
    counter!(
        "kindling_requests_total",
        "context" => context,
        "status" => status.to_string(),
        "exit" => exit_code.to_string()
    )
    .increment(1);
    histogram!("kindling_request_duration_seconds", "context" => context)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_not_found(context: &'static str) {
    counter!("kindling_not_found_total", "context" => context).increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("kindling_errors_total", "kind" => kind).increment(1);
}
