// src/sources/mod.rs
//! Quote providers and the guard that isolates each one.
//!
//! A [`QuoteSource`] talks to exactly one provider and reports typed
//! failures. [`GuardedSource`] wraps it with its circuit breaker and a
//! timer race and turns every failure into an absent result, so nothing
//! from a provider reaches the aggregator's callers.

pub mod curated;
pub mod dummyjson;
pub mod forismatic;
pub mod quotable;
pub mod zenquotes;

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::breaker::{BreakerConfig, BreakerError, CircuitBreaker};
use crate::config::AppConfig;
use crate::metrics::{ensure_described, BREAKER_REJECTIONS, SOURCE_CALLS};
use crate::quote::{Category, Quote, SourceId};
use crate::random::RandomSource;

pub use curated::CuratedSource;
pub use dummyjson::DummyJsonSource;
pub use forismatic::ForismaticSource;
pub use quotable::QuotableSource;
pub use zenquotes::ZenQuotesSource;

/// Why a provider call produced no quote.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// `network` marks connect/reset/timeout-class failures of the transport itself.
    #[error("transport error: {message}")]
    Transport { message: String, network: bool },
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("payload carried no quote")]
    Empty,
}

impl SourceError {
    /// Failures that are expected on flaky networks and not worth a log line.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport { network: true, .. }
        )
    }

    /// Metric label for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport { .. } => "transport",
            Self::Status(_) => "status",
            Self::Malformed(_) => "malformed",
            Self::Empty => "empty",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::Status(status.as_u16());
        }
        if e.is_decode() {
            return Self::Malformed(e.to_string());
        }
        Self::Transport {
            network: e.is_connect() || e.is_timeout() || e.is_request(),
            message: e.to_string(),
        }
    }
}

/// One quote provider.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Fetch one quote, optionally for a category. Unbounded; callers race it.
    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError>;
}

/// Shared HTTP client for all remote providers.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("quote-aggregator/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(3))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET `url` and return the body of a 2xx response.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(resp.text().await?)
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))
}

/// A provider behind its breaker, with a registration priority and call timeout.
pub struct GuardedSource {
    source: Arc<dyn QuoteSource>,
    breaker: CircuitBreaker,
    priority: u32,
    timeout: Duration,
}

impl GuardedSource {
    /// The breaker's `timeout` bounds every guarded call.
    pub fn new(source: Arc<dyn QuoteSource>, breaker: BreakerConfig, priority: u32) -> Self {
        Self {
            source,
            timeout: breaker.timeout,
            breaker: CircuitBreaker::new(breaker),
            priority,
        }
    }

    pub fn id(&self) -> SourceId {
        self.source.id()
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Breaker-guarded, time-bounded fetch. Never fails; a miss is `None`.
    pub async fn fetch(&self, category: Option<Category>) -> Option<Quote> {
        let id = self.id();
        let timeout = self.timeout;
        let source = &self.source;
        let outcome = self
            .breaker
            .execute(move || async move {
                match tokio::time::timeout(timeout, source.fetch_quote(category)).await {
                    Ok(r) => r,
                    Err(_) => Err(SourceError::Timeout(timeout)),
                }
            })
            .await;

        match outcome {
            Ok(q) => {
                counter!(SOURCE_CALLS, "source" => id.as_str(), "outcome" => "ok").increment(1);
                Some(q)
            }
            Err(BreakerError::Open) => {
                tracing::debug!(target: "sources", source = %id, "circuit open, skipping");
                counter!(BREAKER_REJECTIONS, "source" => id.as_str()).increment(1);
                None
            }
            Err(BreakerError::Inner(e)) => {
                if !e.is_quiet() {
                    tracing::warn!(target: "sources", source = %id, error = %e, "source failed");
                }
                counter!(SOURCE_CALLS, "source" => id.as_str(), "outcome" => e.kind()).increment(1);
                None
            }
        }
    }

    /// Raw call bounded by `bound`, bypassing the breaker. Used by the health probe.
    pub async fn probe(
        &self,
        category: Option<Category>,
        bound: Duration,
    ) -> Result<Quote, SourceError> {
        match tokio::time::timeout(bound, self.source.fetch_quote(category)).await {
            Ok(r) => r,
            Err(_) => Err(SourceError::Timeout(bound)),
        }
    }
}

/// Registered providers, ordered by ascending priority (then id).
#[derive(Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<Arc<GuardedSource>>,
}

impl SourceRegistry {
    pub fn new(mut entries: Vec<GuardedSource>) -> Self {
        ensure_described();
        entries.sort_by_key(|g| (g.priority(), g.id()));
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build every enabled adapter from configuration.
    pub fn from_config(
        cfg: &AppConfig,
        client: reqwest::Client,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        let mut entries = Vec::new();
        for id in SourceId::ADAPTERS {
            let settings = cfg.source_settings(id);
            if !settings.enabled {
                tracing::info!(target: "sources", source = %id, "source disabled");
                continue;
            }
            let base = settings.base_url.clone();
            let source: Arc<dyn QuoteSource> = match id {
                SourceId::Curated => Arc::new(CuratedSource::new(rng.clone())),
                SourceId::Forismatic => Arc::new(ForismaticSource::new(client.clone(), base)),
                SourceId::Quotable => Arc::new(QuotableSource::new(client.clone(), base)),
                SourceId::Zenquotes => Arc::new(ZenQuotesSource::new(client.clone(), base)),
                SourceId::Dummyjson => Arc::new(DummyJsonSource::new(client.clone(), base)),
                SourceId::Fallback => continue,
            };
            entries.push(GuardedSource::new(
                source,
                settings.breaker(),
                settings.priority,
            ));
        }
        Self::new(entries)
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<GuardedSource>> {
        self.entries.iter().find(|g| g.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<GuardedSource>> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.entries.iter().map(|g| g.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
