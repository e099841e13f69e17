// src/daily.rs
//! Quote of the day: one pin per category, stable until local end of day.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::aggregate::{Aggregator, QuoteQuery};
use crate::clock::{end_of_local_day, Clock};
use crate::quote::{Category, Quote};

#[derive(Debug, Clone)]
struct Pin {
    quote: Quote,
    expires_at: DateTime<Utc>,
}

pub struct DailyPinService {
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    pins: RwLock<HashMap<Category, Pin>>,
}

impl DailyPinService {
    pub fn new(aggregator: Arc<Aggregator>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            aggregator,
            clock,
            tz,
            pins: RwLock::new(HashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Pinned quote for today, picking a high-quality one on a miss.
    ///
    /// The lock is not held across the pick; two concurrent misses may both
    /// compute and the later write wins.
    pub async fn get_daily_quote(&self, category: Category) -> Quote {
        let now = self.clock.now();
        if let Some(pin) = self.pins.read().await.get(&category) {
            if now <= pin.expires_at {
                return pin.quote.clone();
            }
        }

        let quote = self
            .aggregator
            .get_quote(&QuoteQuery::new(Some(category)).high_quality())
            .await;
        self.pin(category, quote.clone()).await;
        tracing::info!(
            target: "daily",
            category = %category,
            author = %quote.author,
            source = %quote.source_id,
            "daily quote pinned"
        );
        quote
    }

    /// Install `quote` as today's pick for `category`.
    pub async fn pin(&self, category: Category, quote: Quote) {
        let expires_at = end_of_local_day(self.clock.now(), self.tz);
        self.pins
            .write()
            .await
            .insert(category, Pin { quote, expires_at });
    }

    /// Current pin, if any and not expired.
    pub async fn peek(&self, category: Category) -> Option<Quote> {
        let now = self.clock.now();
        self.pins
            .read()
            .await
            .get(&category)
            .filter(|p| now <= p.expires_at)
            .map(|p| p.quote.clone())
    }

    pub async fn clear_cache(&self) {
        self.pins.write().await.clear();
    }
}
