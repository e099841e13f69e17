// src/sources/quotable.rs
//! quotable.io: English quotes with structured tags and tag filtering.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;

use super::{get_text, parse_json, QuoteSource, SourceError};
use crate::quote::{Category, Quote, SourceId};
use crate::tagging::{canonical_tag, infer_tags};

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    content: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// `/random` answers with an object, `/quotes/random` with a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    One(Item),
    Many(Vec<Item>),
}

/// Provider tag filter for a category; `|` is the provider's OR.
pub fn provider_tag(category: Category) -> &'static str {
    match category {
        Category::Wisdom => "wisdom",
        Category::Motivation => "motivational|inspirational",
        Category::Life => "life",
        Category::Love => "love",
        Category::Success => "success",
        Category::Happiness => "happiness",
        Category::Humor => "humorous",
    }
}

pub fn parse_body(body: &str, category: Option<Category>) -> Result<Quote, SourceError> {
    let item = match parse_json::<Payload>(body)? {
        Payload::One(item) => item,
        Payload::Many(items) => items.into_iter().next().ok_or(SourceError::Empty)?,
    };
    let q = Quote::new(&item.content, &item.author, SourceId::Quotable).ok_or(SourceError::Empty)?;

    let mapped: BTreeSet<&str> = item
        .tags
        .iter()
        .filter_map(|t| canonical_tag(t))
        .map(Category::slug)
        .collect();
    if mapped.is_empty() {
        let tags = infer_tags(&q.text, category);
        Ok(q.with_tags(tags))
    } else {
        Ok(q.with_tags(mapped))
    }
}

pub struct QuotableSource {
    client: reqwest::Client,
    base_url: String,
}

impl QuotableSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, category: Option<Category>) -> String {
        match category {
            Some(c) => format!(
                "{}/random?tags={}",
                self.base_url,
                provider_tag(c).replace('|', "%7C")
            ),
            None => format!("{}/random", self.base_url),
        }
    }
}

#[async_trait]
impl QuoteSource for QuotableSource {
    fn id(&self) -> SourceId {
        SourceId::Quotable
    }

    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError> {
        let body = get_text(&self.client, &self.url(category)).await?;
        parse_body(&body, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_tags_are_mapped_to_categories() {
        let body = r#"{"_id":"x","content":"Believe you can and you're halfway there.","author":"Theodore Roosevelt","tags":["Inspirational","Famous Quotes"]}"#;
        let q = parse_body(body, Some(Category::Motivation)).unwrap();
        assert_eq!(q.tags.iter().collect::<Vec<_>>(), vec!["motivation"]);
        assert_eq!(q.author, "Theodore Roosevelt");
    }

    #[test]
    fn array_payload_and_inferred_tags() {
        let body = r#"[{"content":"Love is patient.","author":"Paul","tags":["Famous Quotes"]}]"#;
        let q = parse_body(body, Some(Category::Love)).unwrap();
        assert!(q.has_tag("love"));
    }

    #[test]
    fn empty_array_is_empty() {
        assert!(matches!(parse_body("[]", None), Err(SourceError::Empty)));
    }

    #[test]
    fn category_maps_into_query() {
        let s = QuotableSource::new(reqwest::Client::new(), "http://q.local");
        assert_eq!(
            s.url(Some(Category::Motivation)),
            "http://q.local/random?tags=motivational%7Cinspirational"
        );
        assert_eq!(s.url(Some(Category::Humor)), "http://q.local/random?tags=humorous");
        assert_eq!(s.url(None), "http://q.local/random");
    }
}
