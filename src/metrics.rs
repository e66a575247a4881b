//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub transactions_signed: IntCounter,
    pub broadcast_attempts: IntCounter,
    pub broadcast_success: IntCounter,
    pub broadcast_failed: IntCounter,
    pub retries_invalid_nonce: IntCounter,
    pub retries_expired: IntCounter,
    pub retries_exhausted: IntCounter,
    pub failure_outcomes: IntCounter,

    // Access key cache
    pub access_key_cache_hits: IntCounter,
    pub access_key_cache_misses: IntCounter,
    pub access_key_evictions: IntCounter,

    // Gauges
    pub access_key_cache_size: IntGauge,

    // Histograms
    pub rpc_latency: Histogram,
    pub send_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions_signed = IntCounter::with_opts(Opts::new(
            "transactions_signed_total",
            "Number of transactions signed",
        ))?;

        let broadcast_attempts = IntCounter::with_opts(Opts::new(
            "broadcast_attempts_total",
            "Number of broadcast_tx_commit submissions",
        ))?;

        let broadcast_success = IntCounter::with_opts(Opts::new(
            "broadcast_success_total",
            "Number of submissions accepted by the node",
        ))?;

        let broadcast_failed = IntCounter::with_opts(Opts::new(
            "broadcast_failed_total",
            "Number of sends that ended in a fatal error",
        ))?;

        let retries_invalid_nonce = IntCounter::with_opts(Opts::new(
            "retries_invalid_nonce_total",
            "Retries caused by a stale access key nonce",
        ))?;

        let retries_expired = IntCounter::with_opts(Opts::new(
            "retries_expired_total",
            "Retries caused by an expired reference block",
        ))?;

        let retries_exhausted = IntCounter::with_opts(Opts::new(
            "retries_exhausted_total",
            "Sends that used every attempt without success",
        ))?;

        let failure_outcomes = IntCounter::with_opts(Opts::new(
            "failure_outcomes_total",
            "Executed transactions whose final status is a failure",
        ))?;

        let access_key_cache_hits = IntCounter::with_opts(Opts::new(
            "access_key_cache_hits_total",
            "Access key lookups served from the cache",
        ))?;

        let access_key_cache_misses = IntCounter::with_opts(Opts::new(
            "access_key_cache_misses_total",
            "Access key lookups that queried the node",
        ))?;

        let access_key_evictions = IntCounter::with_opts(Opts::new(
            "access_key_evictions_total",
            "Cached access keys dropped after InvalidNonce",
        ))?;

        let access_key_cache_size = IntGauge::with_opts(Opts::new(
            "access_key_cache_size",
            "Number of cached access keys",
        ))?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "JSON-RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        let send_latency = Histogram::with_opts(
            HistogramOpts::new(
                "send_latency_seconds",
                "End-to-end sign_and_send_transaction latency including retries",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(transactions_signed.clone()))?;
        registry.register(Box::new(broadcast_attempts.clone()))?;
        registry.register(Box::new(broadcast_success.clone()))?;
        registry.register(Box::new(broadcast_failed.clone()))?;
        registry.register(Box::new(retries_invalid_nonce.clone()))?;
        registry.register(Box::new(retries_expired.clone()))?;
        registry.register(Box::new(retries_exhausted.clone()))?;
        registry.register(Box::new(failure_outcomes.clone()))?;
        registry.register(Box::new(access_key_cache_hits.clone()))?;
        registry.register(Box::new(access_key_cache_misses.clone()))?;
        registry.register(Box::new(access_key_evictions.clone()))?;
        registry.register(Box::new(access_key_cache_size.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(send_latency.clone()))?;

        Ok(Self {
            registry,
            transactions_signed,
            broadcast_attempts,
            broadcast_success,
            broadcast_failed,
            retries_invalid_nonce,
            retries_expired,
            retries_exhausted,
            failure_outcomes,
            access_key_cache_hits,
            access_key_cache_misses,
            access_key_evictions,
            access_key_cache_size,
            rpc_latency,
            send_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
