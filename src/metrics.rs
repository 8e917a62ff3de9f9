use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

pub const REQUESTS_TOTAL: &str = "recommendation_requests_total";
pub const CACHE_HITS_TOTAL: &str = "recommendation_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "recommendation_cache_misses_total";
pub const DURATION_MS: &str = "recommendation_duration_ms";
pub const CACHE_TTL_MS: &str = "recommendation_cache_ttl_ms";

// One recorder per process; tests build several apps.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install (once) the Prometheus recorder and publish the cache TTL gauge.
    pub fn init(ttl_ms: u64) -> Self {
        let handle = HANDLE
            .get_or_init(|| {
                let handle = match PrometheusBuilder::new().install_recorder() {
                    Ok(h) => h,
                    Err(e) => {
                        // Another recorder is already global; render an empty detached one.
                        warn!(error = %e, "prometheus recorder not installed");
                        PrometheusBuilder::new().build_recorder().handle()
                    }
                };
                describe();
                handle
            })
            .clone();

        // Static gauge with current TTL (absolute TTL, no sliding refresh)
        gauge!(CACHE_TTL_MS).set(ttl_ms as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!(REQUESTS_TOTAL, "Recommendation requests served.");
    describe_counter!(CACHE_HITS_TOTAL, "Recommendation lists served from cache.");
    describe_counter!(CACHE_MISSES_TOTAL, "Recommendation lists computed after a cache miss.");
    describe_histogram!(DURATION_MS, "Time to answer a recommendation request in milliseconds.");
    describe_gauge!(CACHE_TTL_MS, "Configured recommendation cache TTL in milliseconds.");

    // Register the counters so the series exist before the first request.
    counter!(REQUESTS_TOTAL).increment(0);
    counter!(CACHE_HITS_TOTAL).increment(0);
    counter!(CACHE_MISSES_TOTAL).increment(0);
}
