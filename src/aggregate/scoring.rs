// src/aggregate/scoring.rs
//! Multi-factor scoring and top-N selection.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::quote::{Category, OriginClass, Quote, SourceId};
use crate::random::RandomSource;

/// Score contributions. Every field can be overridden from `[scoring]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub domestic_origin: i32,
    pub has_tags: i32,
    pub category_match: i32,
    pub known_author: i32,
    pub known_author_high_quality: i32,

    pub readable_min: usize,
    pub readable_max: usize,
    pub readable_bonus: i32,
    pub very_short_below: usize,
    pub very_long_above: usize,
    pub extreme_length: i32,

    pub ideal_min: usize,
    pub ideal_max: usize,
    pub ideal_bonus_high_quality: i32,

    /// Per-source bonus; sources missing here use the built-in table.
    pub source_bonus: BTreeMap<SourceId, i32>,
    pub fallback_high_quality: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            domestic_origin: 10,
            has_tags: 5,
            category_match: 8,
            known_author: 3,
            known_author_high_quality: 5,
            readable_min: 50,
            readable_max: 250,
            readable_bonus: 2,
            very_short_below: 30,
            very_long_above: 300,
            extreme_length: -3,
            ideal_min: 80,
            ideal_max: 200,
            ideal_bonus_high_quality: 5,
            source_bonus: BTreeMap::new(),
            fallback_high_quality: -10,
        }
    }
}

fn default_source_bonus(id: SourceId) -> i32 {
    match id {
        SourceId::Curated => 6,
        SourceId::Forismatic => 4,
        SourceId::Quotable => 3,
        SourceId::Zenquotes => 2,
        SourceId::Dummyjson => 1,
        SourceId::Fallback => 0,
    }
}

impl ScoringWeights {
    pub fn source_bonus(&self, id: SourceId) -> i32 {
        self.source_bonus
            .get(&id)
            .copied()
            .unwrap_or_else(|| default_source_bonus(id))
    }

    /// Score one candidate.
    pub fn score(&self, q: &Quote, category: Option<Category>, prefer_high_quality: bool) -> i32 {
        let mut s = 0;

        if q.origin_class == OriginClass::Domestic {
            s += self.domestic_origin;
        }
        if !q.tags.is_empty() {
            s += self.has_tags;
        }
        if let Some(c) = category {
            if q.has_tag(c.slug()) {
                s += self.category_match;
            }
        }
        if q.has_known_author() {
            s += if prefer_high_quality {
                self.known_author_high_quality
            } else {
                self.known_author
            };
        }

        let len = q.text_len();
        if (self.readable_min..=self.readable_max).contains(&len) {
            s += self.readable_bonus;
        } else if len < self.very_short_below || len > self.very_long_above {
            s += self.extreme_length;
        }
        if prefer_high_quality && (self.ideal_min..=self.ideal_max).contains(&len) {
            s += self.ideal_bonus_high_quality;
        }

        s += self.source_bonus(q.source_id);
        if prefer_high_quality && q.source_id == SourceId::Fallback {
            s += self.fallback_high_quality;
        }
        s
    }
}

/// Pick an index from `scores`, which are in priority order.
///
/// Deterministic mode returns the highest score, earliest index on ties.
/// Otherwise one of the `top_n` best is drawn uniformly through `rng`.
/// `scores` must be non-empty.
pub fn select_index(
    scores: &[i32],
    deterministic: bool,
    top_n: usize,
    rng: &dyn RandomSource,
) -> usize {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable: equal scores keep priority order.
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]));

    if deterministic {
        return order.first().copied().unwrap_or(0);
    }
    let pool = top_n.max(1).min(order.len());
    if pool == 0 {
        return 0;
    }
    order[rng.pick_index(pool)]
}
