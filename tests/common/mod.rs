// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use quote_aggregator::aggregate::{Aggregator, AggregatorSettings, ScoringWeights};
use quote_aggregator::breaker::BreakerConfig;
use quote_aggregator::quote::{Category, Quote, SourceId};
use quote_aggregator::random::{RandomSource, SequenceRandom};
use quote_aggregator::sources::{GuardedSource, QuoteSource, SourceError, SourceRegistry};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub enum Behavior {
    Answer(Quote),
    Fail,
    Hang,
    Panic,
}

/// Fake provider with a swappable behavior and a call counter.
pub struct ScriptedSource {
    id: SourceId,
    behavior: Mutex<Behavior>,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(id: SourceId, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            behavior: Mutex::new(behavior),
            calls: AtomicU32::new(0),
        })
    }

    pub fn answering(id: SourceId, text: &str, author: &str) -> Arc<Self> {
        Self::new(id, Behavior::Answer(quote(id, text, author)))
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch_quote(&self, _category: Option<Category>) -> Result<Quote, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Answer(q) => Ok(q),
            Behavior::Fail => Err(SourceError::Status(503)),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SourceError::Empty)
            }
            Behavior::Panic => panic!("scripted panic"),
        }
    }
}

pub fn quote(id: SourceId, text: &str, author: &str) -> Quote {
    Quote::new(text, author, id).unwrap()
}

pub fn breaker(threshold: u32) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: threshold,
        timeout: Duration::from_millis(200),
        reset_timeout: Duration::from_secs(30),
    }
}

/// Registry where each source's priority is its position.
pub fn registry(sources: &[Arc<ScriptedSource>], threshold: u32) -> SourceRegistry {
    SourceRegistry::new(
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| GuardedSource::new(s.clone(), breaker(threshold), i as u32))
            .collect(),
    )
}

pub fn aggregator_with(
    sources: &[Arc<ScriptedSource>],
    rng: Arc<dyn RandomSource>,
) -> Aggregator {
    Aggregator::new(
        registry(sources, 3),
        ScoringWeights::default(),
        rng,
        AggregatorSettings::default(),
    )
}

pub fn aggregator(sources: &[Arc<ScriptedSource>]) -> Aggregator {
    aggregator_with(sources, Arc::new(SequenceRandom::constant(0.0, 0)))
}
