// src/scheduler/jobs.rs
//! The three scheduled jobs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{Aggregator, QuoteQuery};
use crate::daily::DailyPinService;
use crate::metrics::{ENRICHMENT_INSERTED, PROBE_DOWN};
use crate::quote::{Category, SourceId};
use crate::sources::SourceRegistry;
use crate::store::{DailyPick, QuoteRepository, StoreError};

/// A unit of scheduled work. `now` is the fire time.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Category of the day: rotates through every category by local day-of-year.
pub fn category_for(now: DateTime<Utc>, tz: Tz) -> Category {
    let day = now.with_timezone(&tz).ordinal0() as usize;
    Category::ALL[day % Category::ALL.len()]
}

pub struct DailyPickJob {
    aggregator: Arc<Aggregator>,
    daily: Arc<DailyPinService>,
    store: Arc<dyn QuoteRepository>,
}

impl DailyPickJob {
    pub fn new(
        aggregator: Arc<Aggregator>,
        daily: Arc<DailyPinService>,
        store: Arc<dyn QuoteRepository>,
    ) -> Self {
        Self {
            aggregator,
            daily,
            store,
        }
    }

    pub async fn pick(&self, now: DateTime<Utc>) -> Result<DailyPick> {
        let tz = self.daily.timezone();
        let category = category_for(now, tz);
        let quote = self
            .aggregator
            .get_quote(&QuoteQuery::new(Some(category)).high_quality())
            .await;

        let pick = DailyPick {
            date: now.with_timezone(&tz).date_naive(),
            category,
            quote: quote.clone(),
            picked_at: now,
        };
        self.store
            .record_daily_pick(pick.clone())
            .await
            .context("recording daily pick")?;

        match self.store.insert(quote.clone()).await {
            Ok(_) | Err(StoreError::DuplicateFingerprint(_)) => {}
            Err(e) => return Err(e).context("storing daily quote"),
        }
        self.store
            .mark_served(&quote.fingerprint(), now)
            .await
            .context("marking daily quote served")?;

        self.aggregator.invalidate(Some(category)).await;
        self.daily.pin(category, quote).await;
        Ok(pick)
    }
}

#[async_trait]
impl Job for DailyPickJob {
    fn name(&self) -> &'static str {
        "daily_pick"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let pick = self.pick(now).await?;
        tracing::info!(
            target: "scheduler",
            category = %pick.category,
            author = %pick.quote.author,
            source = %pick.quote.source_id,
            "daily pick stored"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub misses: usize,
}

pub struct WeeklyEnrichmentJob {
    registry: SourceRegistry,
    aggregator: Arc<Aggregator>,
    store: Arc<dyn QuoteRepository>,
    sources: Vec<SourceId>,
    timeout: Duration,
    pause: Duration,
}

impl WeeklyEnrichmentJob {
    pub fn new(
        registry: SourceRegistry,
        aggregator: Arc<Aggregator>,
        store: Arc<dyn QuoteRepository>,
        sources: Vec<SourceId>,
    ) -> Self {
        Self {
            registry,
            aggregator,
            store,
            sources,
            timeout: Duration::from_secs(8),
            pause: Duration::from_millis(1_500),
        }
    }

    pub fn with_timing(mut self, timeout: Duration, pause: Duration) -> Self {
        self.timeout = timeout;
        self.pause = pause;
        self
    }

    pub async fn enrich(&self) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport::default();
        let sources: Vec<_> = self
            .sources
            .iter()
            .filter_map(|id| {
                let found = self.registry.get(*id);
                if found.is_none() {
                    tracing::warn!(target: "scheduler", source = %id, "enrichment source not registered");
                }
                found
            })
            .collect();

        for (i, category) in Category::ALL.into_iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            for source in &sources {
                let fetched = tokio::time::timeout(self.timeout, source.fetch(Some(category))).await;
                let Ok(Some(quote)) = fetched else {
                    report.misses += 1;
                    continue;
                };
                match self.store.insert(quote).await {
                    Ok(_) => report.inserted += 1,
                    Err(StoreError::DuplicateFingerprint(_)) => report.duplicates += 1,
                    Err(e) => return Err(e).context("storing enriched quote"),
                }
            }
        }

        self.aggregator.invalidate_all().await;
        counter!(ENRICHMENT_INSERTED).increment(report.inserted as u64);
        Ok(report)
    }
}

#[async_trait]
impl Job for WeeklyEnrichmentJob {
    fn name(&self) -> &'static str {
        "weekly_enrichment"
    }

    async fn run(&self, _now: DateTime<Utc>) -> Result<()> {
        let r = self.enrich().await?;
        tracing::info!(
            target: "scheduler",
            inserted = r.inserted,
            duplicates = r.duplicates,
            misses = r.misses,
            "weekly enrichment finished"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub checked: usize,
    pub down: Vec<SourceId>,
}

pub struct HealthProbeJob {
    registry: SourceRegistry,
    sources: Vec<SourceId>,
    bound: Duration,
}

impl HealthProbeJob {
    pub fn new(registry: SourceRegistry, sources: Vec<SourceId>, bound: Duration) -> Self {
        Self {
            registry,
            sources,
            bound,
        }
    }

    pub async fn probe(&self) -> ProbeReport {
        let mut report = ProbeReport::default();
        for id in &self.sources {
            let Some(source) = self.registry.get(*id) else {
                continue;
            };
            report.checked += 1;
            if let Err(e) = source.probe(None, self.bound).await {
                tracing::warn!(target: "scheduler", source = %id, error = %e, "source down");
                counter!(PROBE_DOWN, "source" => id.as_str()).increment(1);
                report.down.push(*id);
            }
        }
        report
    }
}

#[async_trait]
impl Job for HealthProbeJob {
    fn name(&self) -> &'static str {
        "health_probe"
    }

    async fn run(&self, _now: DateTime<Utc>) -> Result<()> {
        self.probe().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn category_rotates_by_local_day() {
        let tz = chrono_tz::Europe::Moscow;
        // Jan 1 local → ordinal0 0.
        let jan1 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        assert_eq!(category_for(jan1, tz), Category::Wisdom);
        let jan2 = Utc.with_ymd_and_hms(2025, 1, 2, 6, 0, 0).unwrap();
        assert_eq!(category_for(jan2, tz), Category::Motivation);
        // 22:30 UTC on Jan 1 is already Jan 2 in Moscow.
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 22, 30, 0).unwrap();
        assert_eq!(category_for(late, tz), Category::Motivation);
        assert_eq!(category_for(late, chrono_tz::UTC), Category::Wisdom);
        let jan8 = Utc.with_ymd_and_hms(2025, 1, 8, 6, 0, 0).unwrap();
        assert_eq!(category_for(jan8, tz), Category::Wisdom);
    }
}
