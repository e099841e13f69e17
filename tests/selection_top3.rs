// tests/selection_top3.rs
mod common;

use common::{registry, ScriptedSource};
use quote_aggregator::aggregate::{Aggregator, AggregatorSettings, ScoringWeights};
use quote_aggregator::random::SequenceRandom;
use quote_aggregator::{Quote, QuoteQuery, SourceId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn flat_source_bonus() -> ScoringWeights {
    ScoringWeights {
        source_bonus: SourceId::ADAPTERS.into_iter().map(|id| (id, 0)).collect::<BTreeMap<_, _>>(),
        ..ScoringWeights::default()
    }
}

fn scored_pool() -> (Vec<Arc<ScriptedSource>>, Vec<Quote>) {
    let a = common::quote(SourceId::Dummyjson, "Знание — сила, а сила в знании.", "Лев Толстой")
        .with_tags(["wisdom"]);
    let b = common::quote(
        SourceId::Zenquotes,
        "Я помню чудное мгновенье: передо мной явилась ты, как мимолётное виденье.",
        "Александр Пушкин",
    );
    let c = common::quote(
        SourceId::Quotable,
        "Краткость — сестра таланта, а талант без труда ничего не стоит вовсе.",
        "Антон Чехов",
    );
    let d = common::quote(
        SourceId::Forismatic,
        "The secret of getting ahead is getting started, said the old man to us.",
        "Mark Twain",
    )
    .with_tags(["success"]);
    let e = common::quote(SourceId::Curated, "Hi.", "");

    let all = vec![e.clone(), d.clone(), c.clone(), b.clone(), a.clone()];
    let sources = all
        .iter()
        .map(|q| ScriptedSource::new(q.source_id, common::Behavior::Answer(q.clone())))
        .collect();
    (sources, vec![a, b, c, d, e])
}

#[test]
fn pool_scores_as_designed() {
    let w = flat_source_bonus();
    let (_, quotes) = scored_pool();
    let scores: Vec<i32> = quotes.iter().map(|q| w.score(q, None, false)).collect();
    assert_eq!(scores, vec![18, 15, 15, 10, -3]);
}

#[tokio::test]
async fn random_selection_only_returns_the_top_three() {
    let (sources, quotes) = scored_pool();
    let top: BTreeSet<String> = quotes[..3].iter().map(Quote::fingerprint).collect();

    // 0.99 never reuses a cached hit; indices walk every slot.
    let rng = Arc::new(SequenceRandom::new(vec![0.99], (0..7).collect()));
    let agg = Aggregator::new(
        registry(&sources, 3),
        flat_source_bonus(),
        rng,
        AggregatorSettings::default(),
    );

    let mut seen = BTreeSet::new();
    for _ in 0..30 {
        let q = agg.get_quote(&QuoteQuery::new(None)).await;
        assert!(top.contains(&q.fingerprint()), "unexpected pick: {}", q.text);
        seen.insert(q.fingerprint());
    }
    assert_eq!(seen, top);
}

#[tokio::test]
async fn deterministic_selection_returns_the_best() {
    let (sources, quotes) = scored_pool();
    let agg = Aggregator::new(
        registry(&sources, 3),
        flat_source_bonus(),
        Arc::new(SequenceRandom::constant(0.99, 2)),
        AggregatorSettings::default(),
    );
    for _ in 0..5 {
        let q = agg.get_quote(&QuoteQuery::new(None).deterministic()).await;
        assert_eq!(q, quotes[0]);
    }
}

#[tokio::test]
async fn random_and_deterministic_picks_do_not_share_cache_entries() {
    let (sources, quotes) = scored_pool();
    // 0.0 always reuses a hit; index 1 picks the runner-up.
    let agg = Aggregator::new(
        registry(&sources, 3),
        flat_source_bonus(),
        Arc::new(SequenceRandom::constant(0.0, 1)),
        AggregatorSettings::default(),
    );

    let random = agg.get_quote(&QuoteQuery::new(None)).await;
    assert_eq!(random, quotes[1]);

    let best = agg.get_quote(&QuoteQuery::new(None).deterministic()).await;
    assert_eq!(best, quotes[0], "cached random pick leaked into a deterministic query");

    assert_eq!(agg.get_quote(&QuoteQuery::new(None)).await, quotes[1]);
    assert_eq!(agg.get_quote(&QuoteQuery::new(None).deterministic()).await, quotes[0]);
    assert_eq!(agg.cache().len().await, 2);
}
