// src/metrics.rs
//! Metric names, one-time descriptions and the Prometheus recorder.

use anyhow::{anyhow, Context, Result};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const SOURCE_CALLS: &str = "quote_source_calls_total";
pub const BREAKER_REJECTIONS: &str = "quote_breaker_rejections_total";
pub const CACHE_HITS: &str = "quote_cache_hits_total";
pub const FALLBACK: &str = "quote_fallback_total";
pub const AGGREGATE_MS: &str = "quote_aggregate_ms";
pub const JOB_RUNS: &str = "quote_job_runs_total";
pub const ENRICHMENT_INSERTED: &str = "quote_enrichment_inserted_total";
pub const PROBE_DOWN: &str = "quote_probe_down_total";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!(SOURCE_CALLS, "Adapter calls by source and outcome.");
    describe_counter!(
        BREAKER_REJECTIONS,
        "Calls rejected without invoking the adapter because its circuit was open."
    );
    describe_counter!(CACHE_HITS, "Aggregated results served from the result cache.");
    describe_counter!(FALLBACK, "Requests answered from the fallback table.");
    describe_histogram!(
        AGGREGATE_MS,
        "get_quote latency in milliseconds, covering cache hits and fallback answers."
    );
    describe_counter!(JOB_RUNS, "Scheduled job runs by job and outcome.");
    describe_counter!(ENRICHMENT_INSERTED, "Quotes added to the store by enrichment.");
    describe_counter!(PROBE_DOWN, "Health probe failures by source.");
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder, optionally with its own scrape listener.
    ///
    /// Must be called from within a tokio runtime when `listen` is set.
    pub fn install(listen: Option<SocketAddr>) -> Result<Self> {
        let builder = PrometheusBuilder::new();
        let handle = match listen {
            Some(addr) => {
                let builder = builder.with_http_listener(addr);
                let (recorder, exporter) = builder.build().context("building prometheus exporter")?;
                let handle = recorder.handle();
                metrics::set_global_recorder(recorder)
                    .map_err(|e| anyhow!("installing metrics recorder: {e}"))?;
                tokio::spawn(async move {
                    if exporter.await.is_err() {
                        tracing::warn!("metrics exporter stopped");
                    }
                });
                handle
            }
            None => builder
                .install_recorder()
                .context("installing metrics recorder")?,
        };
        ensure_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}
