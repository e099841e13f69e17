// src/app.rs
//! Wires configuration into the running components.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::aggregate::{Aggregator, AggregatorSettings};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::daily::DailyPinService;
use crate::random::{RandomSource, ThreadRandom};
use crate::scheduler::{DailyPickJob, HealthProbeJob, Scheduler, WeeklyEnrichmentJob};
use crate::sources::{http_client, SourceRegistry};
use crate::store::{seed_from_curated, MemoryStore, QuoteRepository};

pub struct App {
    pub config: AppConfig,
    pub tz: Tz,
    pub clock: Arc<dyn Clock>,
    pub registry: SourceRegistry,
    pub aggregator: Arc<Aggregator>,
    pub daily: Arc<DailyPinService>,
    pub store: Arc<dyn QuoteRepository>,
}

impl App {
    /// Build with the system clock, thread RNG and the configured store.
    pub async fn build(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn QuoteRepository> = match &config.store.path {
            Some(p) => Arc::new(
                MemoryStore::open(p)
                    .await
                    .with_context(|| format!("opening store at {}", p.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        let rng: Arc<dyn RandomSource> = Arc::new(ThreadRandom);
        let registry = SourceRegistry::from_config(&config, http_client(), rng.clone());
        Self::assemble(config, registry, store, rng, Arc::new(SystemClock))
    }

    /// Build from explicit parts; used by tests and embedders.
    pub fn assemble(
        config: AppConfig,
        registry: SourceRegistry,
        store: Arc<dyn QuoteRepository>,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let aggregator = Arc::new(Aggregator::new(
            registry.clone(),
            config.scoring.clone(),
            rng,
            AggregatorSettings::from_config(&config),
        ));
        let daily = Arc::new(DailyPinService::new(aggregator.clone(), clock.clone(), tz));
        tracing::info!(
            sources = ?registry.ids(),
            tz = %tz,
            "quote aggregator assembled"
        );
        Ok(Self {
            config,
            tz,
            clock,
            registry,
            aggregator,
            daily,
            store,
        })
    }

    /// Seed an empty store unless disabled in `[store]`.
    pub async fn seed(&self) -> Result<usize> {
        if self.config.store.seed_curated == Some(false) {
            return Ok(0);
        }
        seed_from_curated(self.store.as_ref())
            .await
            .context("seeding store")
    }

    /// Scheduler with the three jobs registered from `[schedule]`.
    pub fn scheduler(&self) -> Result<Scheduler> {
        let s = &self.config.schedule;
        let mut sched = Scheduler::new(self.tz, self.clock.clone());

        sched
            .register(
                &s.daily_pick,
                Arc::new(DailyPickJob::new(
                    self.aggregator.clone(),
                    self.daily.clone(),
                    self.store.clone(),
                )),
            )
            .context("schedule.daily_pick")?;

        let enrichment = WeeklyEnrichmentJob::new(
            self.registry.clone(),
            self.aggregator.clone(),
            self.store.clone(),
            s.enrichment_sources.clone(),
        )
        .with_timing(
            std::time::Duration::from_millis(s.enrichment_timeout_ms),
            std::time::Duration::from_millis(s.enrichment_pause_ms),
        );
        sched
            .register(&s.weekly_enrichment, Arc::new(enrichment))
            .context("schedule.weekly_enrichment")?;

        sched
            .register(
                &s.health_probe,
                Arc::new(HealthProbeJob::new(
                    self.registry.clone(),
                    s.probe_sources.clone(),
                    std::time::Duration::from_millis(s.probe_timeout_ms),
                )),
            )
            .context("schedule.health_probe")?;

        Ok(sched)
    }

    /// Spawn the scheduler when enabled; returns the job task handles.
    pub fn start_scheduler(&self) -> Result<Vec<JoinHandle<()>>> {
        if !self.config.schedule.enabled {
            tracing::info!("scheduler disabled");
            return Ok(Vec::new());
        }
        Ok(self.scheduler()?.spawn())
    }
}
