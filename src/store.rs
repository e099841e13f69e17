// src/store.rs
//! Permanent quote storage shared with the rest of the application.
//!
//! The fingerprint is the uniqueness key. [`MemoryStore`] keeps everything in
//! memory and, when given a path, mirrors it to a JSON snapshot after every
//! mutation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use crate::quote::{Category, OriginClass, Quote, SourceId};
use crate::sources::curated;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate fingerprint: {0}")]
    DuplicateFingerprint(String),
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuote {
    #[serde(flatten)]
    pub quote: Quote,
    pub fingerprint: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub last_served_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub served_count: u32,
}

/// The persisted pick of one local day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPick {
    pub date: NaiveDate,
    pub category: Category,
    pub quote: Quote,
    pub picked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub category: Option<Category>,
    pub source: Option<SourceId>,
    pub origin: Option<OriginClass>,
    pub min_quality: Option<u8>,
    pub limit: Option<usize>,
}

impl QuoteFilter {
    pub fn category(c: Category) -> Self {
        Self {
            category: Some(c),
            ..Self::default()
        }
    }

    fn matches(&self, s: &StoredQuote) -> bool {
        self.category.map_or(true, |c| s.quote.has_tag(c.slug()))
            && self.source.map_or(true, |id| s.quote.source_id == id)
            && self.origin.map_or(true, |o| s.quote.origin_class == o)
            && self.min_quality.map_or(true, |m| s.quote.quality_score >= m)
    }
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Fails with [`StoreError::DuplicateFingerprint`] when the quote is already stored.
    async fn insert(&self, quote: Quote) -> Result<StoredQuote, StoreError>;

    async fn query(&self, filter: &QuoteFilter) -> Result<Vec<StoredQuote>, StoreError>;

    async fn count(&self, filter: &QuoteFilter) -> Result<usize, StoreError>;

    /// Returns `false` when the fingerprint is unknown.
    async fn mark_served(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Replaces any pick already recorded for the same date.
    async fn record_daily_pick(&self, pick: DailyPick) -> Result<(), StoreError>;

    async fn daily_pick(&self, date: NaiveDate) -> Result<Option<DailyPick>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    quotes: Vec<StoredQuote>,
    #[serde(default)]
    picks: BTreeMap<NaiveDate, DailyPick>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn reindex(&mut self) {
        self.index = self
            .quotes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.fingerprint.clone(), i))
            .collect();
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store mirrored to `path`; loads the snapshot if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut snap = match fs::read_to_string(&path).await {
            Ok(s) => serde_json::from_str::<Snapshot>(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        snap.reindex();
        tracing::info!(
            target: "store",
            path = %path.display(),
            quotes = snap.quotes.len(),
            "store opened"
        );
        Ok(Self {
            inner: RwLock::new(snap),
            path: Some(path),
        })
    }

    async fn persist(&self, snap: &Snapshot) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let bytes = serde_json::to_vec_pretty(snap)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn insert(&self, quote: Quote) -> Result<StoredQuote, StoreError> {
        let fingerprint = quote.fingerprint();
        let mut snap = self.inner.write().await;
        if snap.index.contains_key(&fingerprint) {
            return Err(StoreError::DuplicateFingerprint(fingerprint));
        }
        let stored = StoredQuote {
            quote,
            fingerprint: fingerprint.clone(),
            added_at: Utc::now(),
            last_served_at: None,
            served_count: 0,
        };
        snap.quotes.push(stored.clone());
        let at = snap.quotes.len() - 1;
        snap.index.insert(fingerprint, at);
        self.persist(&snap).await?;
        Ok(stored)
    }

    async fn query(&self, filter: &QuoteFilter) -> Result<Vec<StoredQuote>, StoreError> {
        let snap = self.inner.read().await;
        let it = snap.quotes.iter().filter(|s| filter.matches(s)).cloned();
        Ok(match filter.limit {
            Some(n) => it.take(n).collect(),
            None => it.collect(),
        })
    }

    async fn count(&self, filter: &QuoteFilter) -> Result<usize, StoreError> {
        let snap = self.inner.read().await;
        Ok(snap.quotes.iter().filter(|s| filter.matches(s)).count())
    }

    async fn mark_served(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut snap = self.inner.write().await;
        let Some(&i) = snap.index.get(fingerprint) else {
            return Ok(false);
        };
        let entry = &mut snap.quotes[i];
        entry.last_served_at = Some(at);
        entry.served_count = entry.served_count.saturating_add(1);
        self.persist(&snap).await?;
        Ok(true)
    }

    async fn record_daily_pick(&self, pick: DailyPick) -> Result<(), StoreError> {
        let mut snap = self.inner.write().await;
        snap.picks.insert(pick.date, pick);
        self.persist(&snap).await
    }

    async fn daily_pick(&self, date: NaiveDate) -> Result<Option<DailyPick>, StoreError> {
        Ok(self.inner.read().await.picks.get(&date).cloned())
    }
}

/// Fill an empty store with the curated collection. Returns how many were inserted.
pub async fn seed_from_curated(repo: &dyn QuoteRepository) -> Result<usize, StoreError> {
    if repo.count(&QuoteFilter::default()).await? > 0 {
        return Ok(0);
    }
    let mut inserted = 0;
    for q in curated::collection() {
        match repo.insert(q).await {
            Ok(_) => inserted += 1,
            Err(StoreError::DuplicateFingerprint(_)) => {}
            Err(e) => return Err(e),
        }
    }
    tracing::info!(target: "store", inserted, "seeded store from curated collection");
    Ok(inserted)
}
