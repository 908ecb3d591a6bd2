//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (requests by status, assignments,
//! reference fleet sizes, live SSE subscribers) are updated on each
//! `/metrics` scrape (pull model) — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    requests_total: GaugeVec,
    assignments_total: prometheus::Gauge,
    drivers_total: prometheus::Gauge,
    vehicles_total: prometheus::Gauge,
    sse_subscribers: prometheus::Gauge,
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("coachlink_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "coachlink_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "coachlink_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let requests_total = GaugeVec::new(
            Opts::new(
                "coachlink_requests_total",
                "Total service requests by status",
            ),
            &["status"],
        )
        .expect("metric can be created");

        let assignments_total = prometheus::Gauge::new(
            "coachlink_assignments_total",
            "Total driver/vehicle assignments",
        )
        .expect("metric can be created");

        let drivers_total =
            prometheus::Gauge::new("coachlink_drivers_total", "Total registered drivers")
                .expect("metric can be created");

        let vehicles_total =
            prometheus::Gauge::new("coachlink_vehicles_total", "Total registered vehicles")
                .expect("metric can be created");

        let sse_subscribers = prometheus::Gauge::new(
            "coachlink_sse_subscribers",
            "Currently connected SSE subscribers",
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(drivers_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(vehicles_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(sse_subscribers.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                requests_total,
                assignments_total,
                drivers_total,
                vehicles_total,
                sse_subscribers,
            }),
        }
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the requests-by-status gauge for updating.
    pub fn requests_total(&self) -> &GaugeVec {
        &self.inner.requests_total
    }

    /// Access the assignments gauge for updating.
    pub fn assignments_total(&self) -> &prometheus::Gauge {
        &self.inner.assignments_total
    }

    /// Access the drivers gauge for updating.
    pub fn drivers_total(&self) -> &prometheus::Gauge {
        &self.inner.drivers_total
    }

    /// Access the vehicles gauge for updating.
    pub fn vehicles_total(&self) -> &prometheus::Gauge {
        &self.inner.vehicles_total
    }

    /// Access the SSE subscriber gauge for updating.
    pub fn sse_subscribers(&self) -> &prometheus::Gauge {
        &self.inner.sse_subscribers
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing numeric id segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels: `/api/requests/42`
/// and `/api/requests/43` both record as `/api/requests/{id}`.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_are_normalized() {
        assert_eq!(normalize_path("/api/requests/42"), "/api/requests/{id}");
        assert_eq!(normalize_path("/api/requests"), "/api/requests");
        assert_eq!(
            normalize_path("/api/drivers/7/assignments"),
            "/api/drivers/{id}/assignments"
        );
    }

    #[test]
    fn encode_includes_registered_metrics() {
        let metrics = ApiMetrics::new();
        metrics.record_request("GET", "/api/requests", 200, 0.01);
        metrics.requests_total().with_label_values(&["pending"]).set(3.0);
        let body = metrics.gather_and_encode().unwrap();
        assert!(body.contains("coachlink_http_requests_total"));
        assert!(body.contains("coachlink_requests_total"));
    }
}
