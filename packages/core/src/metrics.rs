//! Prometheus metrics registry for the dashboard client and asset server.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the orchestrator and the asset server.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{
    Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Backend calls run through the orchestrator (success + failure).
    pub requests_total: Counter,
    /// Backend calls that ended in an error.
    pub request_errors_total: Counter,
    /// Orchestrated call latency in seconds.
    pub request_duration: Histogram,
    /// Cached lookups answered without a backend call.
    pub cache_hits_total: Counter,
    /// Cached lookups that had to call the backend.
    pub cache_misses_total: Counter,
    /// Retry attempts scheduled after a failure.
    pub retries_total: Counter,
    /// Poll invocations across all pollers.
    pub poll_ticks_total: Counter,
    /// Asset server request count, labelled by method and status code.
    pub http_requests_total: CounterVec,
    /// Asset server latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

const LATENCY_BUCKETS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_requests_total",
            "Backend calls executed through the orchestrator",
        ))?;

        let request_errors_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_request_errors_total",
            "Backend calls that failed",
        ))?;

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "logistics_dashboard_request_duration_seconds",
                "Backend call latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        let cache_hits_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_cache_hits_total",
            "Cached lookups served without a backend call",
        ))?;

        let cache_misses_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_cache_misses_total",
            "Cached lookups that went to the backend",
        ))?;

        let retries_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_retries_total",
            "Retry attempts scheduled after a failed call",
        ))?;

        let poll_ticks_total = Counter::with_opts(Opts::new(
            "logistics_dashboard_poll_ticks_total",
            "Poll invocations",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "logistics_dashboard_http_requests_total",
                "Asset server requests by method and status",
            ),
            &["method", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "logistics_dashboard_http_request_duration_seconds",
                "Asset server latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_errors_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(poll_ticks_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            requests_total,
            request_errors_total,
            request_duration,
            cache_hits_total,
            cache_misses_total,
            retries_total,
            poll_ticks_total,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
