//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): forwarded requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): end-to-end latency
//! - `lb_forward_errors_total` (counter): transport failures by backend
//! - `lb_backend_healthy` (gauge): 1 = healthy, 0 = unhealthy
//!
//! # Design Decisions
//! - Prometheus exposition on a dedicated listener, separate from traffic
//! - Low-overhead updates (atomic operations under the hood)
//! - Recording is a no-op until an exporter is installed, so tests and the
//!   metrics-disabled path need no special handling

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must run inside the Tokio runtime. Failure to install is logged and
/// ignored; the balancer works without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    metrics::counter!("lb_requests_total", &labels).increment(1);
    metrics::histogram!("lb_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a transport-level forwarding failure.
pub fn record_forward_error(backend: &str) {
    metrics::counter!("lb_forward_errors_total", "backend" => backend.to_string()).increment(1);
}

/// Record a backend's probed health state.
pub fn record_backend_health(backend: &str, healthy: bool) {
    let value = if healthy { 1.0 } else { 0.0 };
    metrics::gauge!("lb_backend_healthy", "backend" => backend.to_string()).set(value);
}
