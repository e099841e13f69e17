//! # Quote model
//!
//! The item every source produces and every caller receives, plus the
//! identifiers around it (source ids, categories) and the fingerprint used
//! as the uniqueness key in storage and the dedup key at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::tagging;

/// Author recorded when a provider gives none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Default quality for items that carry no curation signal.
pub const DEFAULT_QUALITY: u8 = 5;

/// Origin classification of an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginClass {
    Domestic,
    Foreign,
}

/// Identifies which adapter produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Curated,
    Forismatic,
    Quotable,
    Zenquotes,
    Dummyjson,
    Fallback,
}

impl SourceId {
    /// Every adapter variant (the fallback table is not an adapter).
    pub const ADAPTERS: [SourceId; 5] = [
        SourceId::Curated,
        SourceId::Forismatic,
        SourceId::Quotable,
        SourceId::Zenquotes,
        SourceId::Dummyjson,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Curated => "curated",
            Self::Forismatic => "forismatic",
            Self::Quotable => "quotable",
            Self::Zenquotes => "zenquotes",
            Self::Dummyjson => "dummyjson",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curated" => Ok(Self::Curated),
            "forismatic" => Ok(Self::Forismatic),
            "quotable" => Ok(Self::Quotable),
            "zenquotes" => Ok(Self::Zenquotes),
            "dummyjson" => Ok(Self::Dummyjson),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// Quote category requested by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Wisdom,
    Motivation,
    Life,
    Love,
    Success,
    Happiness,
    Humor,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Wisdom,
        Category::Motivation,
        Category::Life,
        Category::Love,
        Category::Success,
        Category::Happiness,
        Category::Humor,
    ];

    /// Display name, as external callers pass it.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wisdom => "Wisdom",
            Self::Motivation => "Motivation",
            Self::Life => "Life",
            Self::Love => "Love",
            Self::Success => "Success",
            Self::Happiness => "Happiness",
            Self::Humor => "Humor",
        }
    }

    /// Lowercase tag form stored on quotes.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Wisdom => "wisdom",
            Self::Motivation => "motivation",
            Self::Life => "life",
            Self::Love => "love",
            Self::Success => "success",
            Self::Happiness => "happiness",
            Self::Humor => "humor",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category '{wanted}'"))
    }
}

/// One quote as produced by a source and returned to callers.
///
/// Serializes to `{ text, author, originClass, tags, sourceId, qualityScore }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub origin_class: OriginClass,
    pub tags: BTreeSet<String>,
    pub source_id: SourceId,
    #[serde(default = "default_quality")]
    pub quality_score: u8,
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

impl Quote {
    /// Build a quote from raw provider fields.
    ///
    /// Returns `None` when the text is blank. A blank author becomes
    /// [`UNKNOWN_AUTHOR`]; origin is classified from the author.
    pub fn new(text: &str, author: &str, source_id: SourceId) -> Option<Self> {
        let text = collapse_ws(text);
        if text.is_empty() {
            return None;
        }
        let author = collapse_ws(author.trim_matches(|c: char| c == '-' || c == '—' || c.is_whitespace()));
        let author = if author.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            author
        };
        let origin_class = tagging::classify_origin(&author);
        Some(Self {
            text,
            author,
            origin_class,
            tags: BTreeSet::new(),
            source_id,
            quality_score: DEFAULT_QUALITY,
        })
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if !tag.is_empty() {
                self.tags.insert(tag);
            }
        }
        self
    }

    /// Clamp into the 1..=10 range.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality_score = quality.clamp(1, 10);
        self
    }

    pub fn with_origin(mut self, origin: OriginClass) -> Self {
        self.origin_class = origin;
        self
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.text, &self.author)
    }

    /// True unless the author is missing or anonymous.
    pub fn has_known_author(&self) -> bool {
        let a = normalize(&self.author);
        !(a.is_empty() || a == "unknown" || a == "anonymous" || a == "неизвестный автор")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Length in characters (not bytes).
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let lowered: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize(text) + "_" + normalize(author)`.
pub fn fingerprint(text: &str, author: &str) -> String {
    format!("{}_{}", normalize(text), normalize(author))
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
