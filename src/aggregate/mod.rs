// src/aggregate/mod.rs
//! Fan-out to every source, then dedup, filter, score and pick one.
//!
//! `get_quote` is total: the worst a caller ever sees is the fallback quote.

pub mod fallback;
pub mod scoring;

use metrics::{counter, histogram};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::metrics::{ensure_described, AGGREGATE_MS, CACHE_HITS, FALLBACK};
use crate::quote::{Category, Quote};
use crate::random::RandomSource;
use crate::sources::SourceRegistry;

pub use scoring::{select_index, ScoringWeights};

/// Parameters of one aggregation request.
#[derive(Debug, Clone)]
pub struct QuoteQuery {
    pub category: Option<Category>,
    /// `false` makes selection deterministic and always reuses a cache hit.
    pub random: bool,
    /// Fingerprints the caller has already seen.
    pub exclude: HashSet<String>,
    pub prefer_high_quality: bool,
}

impl Default for QuoteQuery {
    fn default() -> Self {
        Self {
            category: None,
            random: true,
            exclude: HashSet::new(),
            prefer_high_quality: false,
        }
    }
}

impl QuoteQuery {
    pub fn new(category: Option<Category>) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    pub fn deterministic(mut self) -> Self {
        self.random = false;
        self
    }

    pub fn high_quality(mut self) -> Self {
        self.prefer_high_quality = true;
        self
    }

    pub fn excluding<I, S>(mut self, fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fingerprints.into_iter().map(Into::into));
        self
    }

    fn uses_cache(&self) -> bool {
        self.exclude.is_empty() && !self.prefer_high_quality
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub reuse_probability: f64,
    pub top_n: usize,
    pub result_ttl: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            reuse_probability: 0.7,
            top_n: 3,
            result_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl AggregatorSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            reuse_probability: cfg.cache.reuse_probability,
            top_n: cfg.selection.top_n,
            result_ttl: cfg.result_ttl(),
        }
    }
}

/// Random and deterministic picks are cached under separate keys so neither
/// mode is ever answered with the other's result.
pub fn cache_key(category: Option<Category>, random: bool) -> String {
    let slug = category.map(Category::slug).unwrap_or("any");
    if random {
        format!("quote:{slug}")
    } else {
        format!("quote:{slug}:best")
    }
}

pub struct Aggregator {
    registry: SourceRegistry,
    cache: TtlCache<Quote>,
    weights: ScoringWeights,
    rng: Arc<dyn RandomSource>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        registry: SourceRegistry,
        weights: ScoringWeights,
        rng: Arc<dyn RandomSource>,
        settings: AggregatorSettings,
    ) -> Self {
        ensure_described();
        Self {
            registry,
            cache: TtlCache::new(settings.result_ttl),
            weights,
            rng,
            settings,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &TtlCache<Quote> {
        &self.cache
    }

    pub async fn get_quote(&self, query: &QuoteQuery) -> Quote {
        let t0 = Instant::now();
        let quote = self.resolve(query).await;
        histogram!(AGGREGATE_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
        quote
    }

    async fn resolve(&self, query: &QuoteQuery) -> Quote {
        let key = cache_key(query.category, query.random);

        if query.uses_cache() {
            if let Some(hit) = self.cache.get(&key).await {
                if !query.random || self.rng.next_f64() < self.settings.reuse_probability {
                    counter!(CACHE_HITS).increment(1);
                    return hit;
                }
            }
        }

        let Some(chosen) = self.compute(query).await else {
            counter!(FALLBACK).increment(1);
            tracing::info!(
                target: "aggregate",
                category = ?query.category,
                "no source answered, serving fallback"
            );
            return fallback::quote_for(query.category);
        };

        if query.uses_cache() {
            self.cache.set(key, chosen.clone(), None).await;
        }
        chosen
    }

    /// Everything after the cache probe. `None` when no source produced anything.
    async fn compute(&self, query: &QuoteQuery) -> Option<Quote> {
        let results = self.fan_out(query.category).await;
        if results.is_empty() {
            return None;
        }

        let unique = dedup(results);
        let candidates = exclude(&unique, &query.exclude);

        let scores: Vec<i32> = candidates
            .iter()
            .map(|q| {
                self.weights
                    .score(q, query.category, query.prefer_high_quality)
            })
            .collect();
        let deterministic = query.prefer_high_quality || !query.random;
        let idx = select_index(&scores, deterministic, self.settings.top_n, self.rng.as_ref());

        tracing::debug!(
            target: "aggregate",
            candidates = candidates.len(),
            score = scores.get(idx).copied().unwrap_or_default(),
            "selected quote"
        );
        candidates.get(idx).map(|q| (*q).clone())
    }

    /// Call every source concurrently; keep successes in priority order.
    pub async fn fan_out(&self, category: Option<Category>) -> Vec<Quote> {
        let mut set = JoinSet::new();
        for (slot, source) in self.registry.iter().enumerate() {
            let source = Arc::clone(source);
            set.spawn(async move { (slot, source.fetch(category).await) });
        }

        let mut slots: Vec<Option<Quote>> = vec![None; self.registry.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, Some(q))) => slots[slot] = Some(q),
                Ok((_, None)) => {}
                Err(e) => {
                    tracing::warn!(target: "aggregate", error = %e, "source task failed");
                }
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// Drop the cached result for one category (or the uncategorized one).
    pub async fn invalidate(&self, category: Option<Category>) {
        self.cache.delete(&cache_key(category, true)).await;
        self.cache.delete(&cache_key(category, false)).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.delete_prefix("quote:").await;
    }
}

/// First occurrence of each fingerprint wins.
pub fn dedup(quotes: Vec<Quote>) -> Vec<Quote> {
    let mut seen = HashSet::new();
    quotes
        .into_iter()
        .filter(|q| seen.insert(q.fingerprint()))
        .collect()
}

/// Remove excluded fingerprints (case-insensitive); keep everything if nothing would remain.
pub fn exclude<'a>(quotes: &'a [Quote], excluded: &HashSet<String>) -> Vec<&'a Quote> {
    if excluded.is_empty() {
        return quotes.iter().collect();
    }
    let lowered: HashSet<String> = excluded.iter().map(|f| f.to_lowercase()).collect();
    let kept: Vec<&Quote> = quotes
        .iter()
        .filter(|q| !lowered.contains(&q.fingerprint().to_lowercase()))
        .collect();
    if kept.is_empty() {
        quotes.iter().collect()
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::SourceId;

    fn q(text: &str, author: &str, src: SourceId) -> Quote {
        Quote::new(text, author, src).unwrap()
    }

    #[test]
    fn dedup_keeps_first_seen() {
        let out = dedup(vec![
            q("Know thyself.", "Socrates", SourceId::Curated),
            q("know thyself", "SOCRATES", SourceId::Quotable),
            q("Other.", "X", SourceId::Quotable),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source_id, SourceId::Curated);
    }

    #[test]
    fn exclusion_is_case_insensitive_and_never_empties() {
        let all = vec![
            q("One thing.", "A", SourceId::Curated),
            q("Two things.", "B", SourceId::Curated),
        ];
        let ex: HashSet<String> = ["ONE THING_A".to_string()].into_iter().collect();
        let kept = exclude(&all, &ex);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "Two things.");

        let every: HashSet<String> = all.iter().map(Quote::fingerprint).collect();
        assert_eq!(exclude(&all, &every).len(), 2);
    }

    #[test]
    fn cache_keys() {
        assert_eq!(cache_key(None, true), "quote:any");
        assert_eq!(cache_key(Some(Category::Love), true), "quote:love");
        assert_eq!(cache_key(Some(Category::Love), false), "quote:love:best");
    }

    #[test]
    fn query_builders() {
        let qq = QuoteQuery::new(Some(Category::Life))
            .deterministic()
            .excluding(["a_b"]);
        assert!(!qq.random);
        assert!(!qq.uses_cache());
        assert!(QuoteQuery::default().uses_cache());
        assert!(!QuoteQuery::default().high_quality().uses_cache());
    }
}
