// tests/cache_reuse.rs
mod common;

use common::{aggregator_with, Behavior, ScriptedSource};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use quote_aggregator::metrics::{ensure_described, AGGREGATE_MS, CACHE_HITS};
use quote_aggregator::random::SequenceRandom;
use quote_aggregator::{Category, QuoteQuery, SourceId};
use serial_test::serial;
use std::sync::Arc;

// One global recorder for this test binary.
fn handle() -> &'static PrometheusHandle {
    static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
    HANDLE.get_or_init(|| {
        let h = PrometheusBuilder::new()
            .install_recorder()
            .expect("recorder");
        ensure_described();
        h
    })
}

/// Value of an unlabelled series in the rendered exposition (0 when absent).
fn series(name: &str) -> u64 {
    handle()
        .render()
        .lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' '))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map_or(0, |v| v as u64)
}

fn latency_count() -> u64 {
    series(&format!("{AGGREGATE_MS}_count"))
}

#[tokio::test]
#[serial]
async fn cached_hit_is_reused_below_threshold_and_recomputed_above() {
    handle();
    let src = ScriptedSource::answering(SourceId::Quotable, "Love is patient.", "Paul");
    // First draw 0.5 (< 0.7, reuse), second 0.8 (>= 0.7, recompute).
    let rng = Arc::new(SequenceRandom::new(vec![0.5, 0.8], vec![0]));
    let agg = aggregator_with(&[src.clone()], rng);
    let query = QuoteQuery::new(Some(Category::Love));
    let hits0 = series(CACHE_HITS);
    let timed0 = latency_count();

    agg.get_quote(&query).await;
    assert_eq!(src.calls(), 1);
    assert_eq!(series(CACHE_HITS), hits0);

    agg.get_quote(&query).await;
    assert_eq!(src.calls(), 1, "0.5 draw must reuse the cached result");
    assert_eq!(series(CACHE_HITS), hits0 + 1);

    agg.get_quote(&query).await;
    assert_eq!(src.calls(), 2, "0.8 draw must recompute");
    assert_eq!(series(CACHE_HITS), hits0 + 1);

    // Every exit is timed, the cache hit included.
    assert_eq!(latency_count(), timed0 + 3);
}

#[tokio::test]
#[serial]
async fn fallback_answers_are_timed() {
    handle();
    let src = ScriptedSource::new(SourceId::Zenquotes, Behavior::Fail);
    let agg = aggregator_with(&[src], Arc::new(SequenceRandom::constant(0.0, 0)));
    let timed0 = latency_count();

    let q = agg.get_quote(&QuoteQuery::new(Some(Category::Humor))).await;
    assert_eq!(q.source_id, SourceId::Fallback);
    assert_eq!(latency_count(), timed0 + 1);
}
