// tests/aggregator_dedup.rs
mod common;

use common::{aggregator, ScriptedSource};
use quote_aggregator::aggregate::dedup;
use quote_aggregator::{Category, Quote, QuoteQuery, SourceId};

#[tokio::test]
async fn same_normalized_quote_from_two_sources_is_one_candidate() {
    let sources = vec![
        ScriptedSource::answering(SourceId::Curated, "Know thyself.", "Socrates"),
        ScriptedSource::answering(SourceId::Quotable, "  know THYSELF ", "socrates!"),
    ];
    let agg = aggregator(&sources);

    let raw = agg.fan_out(Some(Category::Wisdom)).await;
    assert_eq!(raw.len(), 2);
    let unique = dedup(raw);
    assert_eq!(unique.len(), 1);
    // Registration priority decides which copy survives.
    assert_eq!(unique[0].source_id, SourceId::Curated);
}

#[tokio::test]
async fn excluding_seen_fingerprint_picks_another() {
    let sources = vec![
        ScriptedSource::answering(SourceId::Curated, "Рукописи не горят.", "Михаил Булгаков"),
        ScriptedSource::answering(SourceId::Quotable, "Simplicity is the ultimate sophistication.", "Leonardo da Vinci"),
    ];
    let agg = aggregator(&sources);

    let first = agg
        .get_quote(&QuoteQuery::new(None).deterministic())
        .await;
    assert_eq!(first.author, "Михаил Булгаков");

    let next = agg
        .get_quote(&QuoteQuery::new(None).excluding([first.fingerprint().to_uppercase()]))
        .await;
    assert_eq!(next.author, "Leonardo da Vinci");
}

#[tokio::test]
async fn excluding_everything_still_returns_an_item() {
    let sources = vec![
        ScriptedSource::answering(SourceId::Curated, "One.", "A"),
        ScriptedSource::answering(SourceId::Quotable, "Two.", "B"),
    ];
    let agg = aggregator(&sources);
    let all: Vec<String> = agg
        .fan_out(None)
        .await
        .iter()
        .map(Quote::fingerprint)
        .collect();

    let q = agg
        .get_quote(&QuoteQuery::new(None).excluding(all.clone()))
        .await;
    assert!(all.contains(&q.fingerprint()));
    assert_ne!(q.source_id, SourceId::Fallback);
}

#[tokio::test]
async fn excluded_requests_bypass_and_skip_the_cache() {
    let src = ScriptedSource::answering(SourceId::Quotable, "Cache me if you can.", "X");
    let agg = aggregator(std::slice::from_ref(&src));

    agg.get_quote(&QuoteQuery::new(None).excluding(["nothing_here"]))
        .await;
    assert!(agg.cache().is_empty().await);

    agg.get_quote(&QuoteQuery::new(None).deterministic()).await;
    assert_eq!(agg.cache().len().await, 1);
    let calls = src.calls();

    // Deterministic requests always reuse a hit.
    agg.get_quote(&QuoteQuery::new(None).deterministic()).await;
    assert_eq!(src.calls(), calls);

    agg.invalidate(None).await;
    assert!(agg.cache().is_empty().await);
}
