use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const CACHE_HITS: &str = "sentiment_cache_hits_total";
pub const CACHE_MISSES: &str = "sentiment_cache_misses_total";
pub const CACHE_EVICTIONS: &str = "sentiment_cache_evictions_total";
pub const PRIMARY_USED: &str = "sentiment_primary_used_total";
pub const FALLBACK_USED: &str = "sentiment_fallback_used_total";
pub const ANALYSIS_FAILURES: &str = "sentiment_analysis_failures_total";
pub const BATCH_MS: &str = "sentiment_batch_ms";
pub const CACHE_TTL_SECS: &str = "sentiment_cache_ttl_secs";

/// One-time series descriptions so they show up on /metrics.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CACHE_HITS, "Result cache hits.");
        describe_counter!(CACHE_MISSES, "Result cache misses (absent, expired or malformed).");
        describe_counter!(CACHE_EVICTIONS, "Entries evicted for expiry or capacity, plus results dropped as stale after a lexicon change.");
        describe_counter!(PRIMARY_USED, "Results produced by the primary analyzer.");
        describe_counter!(
            FALLBACK_USED,
            "Results produced by the fallback analyzer, labelled by primary failure reason."
        );
        describe_counter!(ANALYSIS_FAILURES, "Texts neither analyzer could classify.");
        describe_histogram!(BATCH_MS, "Batch classification time in milliseconds.");
        describe_gauge!(CACHE_TTL_SECS, "Configured result cache TTL in seconds.");
    });
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder on first use and publish
    /// the cache TTL gauge. Later calls reuse it (tests build several routers
    /// per process).
    pub fn global(ttl_secs: u64) -> Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();
        Ok(Self::from_handle(handle, ttl_secs))
    }

    fn from_handle(handle: PrometheusHandle, ttl_secs: u64) -> Self {
        ensure_metrics_described();
        gauge!(CACHE_TTL_SECS).set(ttl_secs as f64);
        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
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
