//! Prometheus metrics for the background caches and market feed.
//!
//! [`NodeMetrics`] owns the [`Registry`] shared with the HTTP API, which
//! registers its governance counters into the same registry and encodes it
//! at `GET /metrics`.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Successful cache refreshes, by cache (`balances`, `tokens`, `prices`).
    pub cache_refreshes: IntCounterVec,
    /// Failed cache refreshes, by cache.
    pub cache_refresh_failures: IntCounterVec,
    /// Market-feed chunks that failed and were skipped.
    pub market_chunk_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub listed_tokens: IntGauge,
    pub market_tokens: IntGauge,
    pub watched_wallets: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cache_refreshes = register_int_counter_vec_with_registry!(
            Opts::new("fomo_cache_refreshes_total", "Successful background cache refreshes"),
            &["cache"],
            registry
        )?;
        let cache_refresh_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "fomo_cache_refresh_failures_total",
                "Failed background cache refreshes"
            ),
            &["cache"],
            registry
        )?;
        let market_chunk_failures = register_int_counter_with_registry!(
            Opts::new(
                "fomo_market_chunk_failures_total",
                "Market feed chunks skipped after a request failure"
            ),
            registry
        )?;
        let listed_tokens = register_int_gauge_with_registry!(
            Opts::new("fomo_listed_tokens", "Tokens in the listed-token cache"),
            registry
        )?;
        let market_tokens = register_int_gauge_with_registry!(
            Opts::new("fomo_market_tokens", "Tokens with a market price"),
            registry
        )?;
        let watched_wallets = register_int_gauge_with_registry!(
            Opts::new("fomo_watched_wallets", "Wallets in the balance cache"),
            registry
        )?;

        Ok(Self {
            registry,
            cache_refreshes,
            cache_refresh_failures,
            market_chunk_failures,
            listed_tokens,
            market_tokens,
            watched_wallets,
        })
    }
}
