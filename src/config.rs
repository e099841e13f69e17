// src/config.rs
//! Service configuration loaded from TOML.
//!
//! Lookup order:
//! 1) `$QUOTES_CONFIG_PATH` (must exist when set)
//! 2) `config/quotes.toml`
//! 3) built-in defaults
//!
//! Every section has defaults, so a partial file only overrides what it names.

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::scoring::ScoringWeights;
use crate::breaker::BreakerConfig;
use crate::quote::SourceId;

pub const DEFAULT_CONFIG_PATH: &str = "config/quotes.toml";
pub const ENV_CONFIG_PATH: &str = "QUOTES_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// IANA zone used for day boundaries and cron evaluation.
    pub timezone: String,
    pub cache: CacheSettings,
    pub selection: SelectionSettings,
    pub scoring: ScoringWeights,
    pub sources: BTreeMap<SourceId, SourceOverride>,
    pub schedule: ScheduleSettings,
    pub store: StoreSettings,
    pub metrics: MetricsSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Moscow".to_string(),
            cache: CacheSettings::default(),
            selection: SelectionSettings::default(),
            scoring: ScoringWeights::default(),
            sources: BTreeMap::new(),
            schedule: ScheduleSettings::default(),
            store: StoreSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub result_ttl_secs: u64,
    /// Probability of serving a cache hit instead of recomputing.
    pub reuse_probability: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            result_ttl_secs: 30 * 60,
            reuse_probability: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Size of the pool random selection draws from.
    pub top_n: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self { top_n: 3 }
    }
}

/// Partial per-source settings as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceOverride {
    pub enabled: Option<bool>,
    pub priority: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub reset_timeout_ms: Option<u64>,
    pub base_url: Option<String>,
}

/// Effective per-source settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub enabled: bool,
    /// Lower runs first and wins score ties.
    pub priority: u32,
    pub timeout_ms: u64,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub base_url: String,
}

impl SourceSettings {
    pub fn defaults_for(id: SourceId) -> Self {
        let (priority, timeout_ms, reset_timeout_ms, base_url) = match id {
            SourceId::Curated => (0, 2_000, 30_000, ""),
            SourceId::Forismatic => (10, 5_000, 60_000, "http://api.forismatic.com"),
            SourceId::Quotable => (20, 4_000, 60_000, "https://api.quotable.io"),
            SourceId::Zenquotes => (30, 3_000, 120_000, "https://zenquotes.io"),
            SourceId::Dummyjson => (40, 3_000, 60_000, "https://dummyjson.com"),
            SourceId::Fallback => (u32::MAX, 0, 0, ""),
        };
        Self {
            enabled: id != SourceId::Fallback,
            priority,
            timeout_ms,
            failure_threshold: 3,
            reset_timeout_ms,
            base_url: base_url.to_string(),
        }
    }

    fn apply(mut self, o: &SourceOverride) -> Self {
        if let Some(v) = o.enabled {
            self.enabled = v;
        }
        if let Some(v) = o.priority {
            self.priority = v;
        }
        if let Some(v) = o.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = o.failure_threshold {
            self.failure_threshold = v;
        }
        if let Some(v) = o.reset_timeout_ms {
            self.reset_timeout_ms = v;
        }
        if let Some(v) = &o.base_url {
            self.base_url = v.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold.max(1),
            timeout: self.timeout(),
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub daily_pick: String,
    pub weekly_enrichment: String,
    pub health_probe: String,
    pub enrichment_sources: Vec<SourceId>,
    pub probe_sources: Vec<SourceId>,
    pub enrichment_timeout_ms: u64,
    pub enrichment_pause_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_pick: "0 6 * * *".to_string(),
            weekly_enrichment: "0 3 * * 1".to_string(),
            health_probe: "*/15 * * * *".to_string(),
            enrichment_sources: vec![SourceId::Forismatic, SourceId::Quotable],
            probe_sources: vec![SourceId::Zenquotes, SourceId::Dummyjson],
            enrichment_timeout_ms: 8_000,
            enrichment_pause_ms: 1_500,
            probe_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON snapshot file; in-memory only when absent.
    pub path: Option<PathBuf>,
    /// Seed an empty store from the curated collection on start-up.
    pub seed_curated: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Prometheus scrape listener, e.g. "127.0.0.1:9100".
    pub listen: Option<SocketAddr>,
}

impl AppConfig {
    /// Effective settings for one source: built-in defaults overlaid with the file.
    pub fn source_settings(&self, id: SourceId) -> SourceSettings {
        let base = SourceSettings::defaults_for(id);
        match self.sources.get(&id) {
            Some(o) => base.apply(o),
            None => base,
        }
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid timezone '{}': {e}", self.timezone))
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.result_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.selection.top_n == 0 {
            bail!("selection.top_n must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.cache.reuse_probability) {
            bail!("cache.reuse_probability must be within 0.0..=1.0");
        }
        if self.sources.contains_key(&SourceId::Fallback) {
            bail!("'fallback' is not a configurable source");
        }
        Ok(())
    }
}

/// Load and validate configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load using env var + fallbacks (see module docs).
pub fn load_default() -> Result<AppConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return load_from(&default_path);
    }
    let cfg = AppConfig::default();
    cfg.validate()?;
    Ok(cfg)
}
