//! zenquotes.io: English quotes as a one-element array.

use async_trait::async_trait;
use serde::Deserialize;

use super::{get_text, parse_json, QuoteSource, SourceError};
use crate::quote::{Category, Quote, SourceId};
use crate::tagging::infer_tags;

/// Author the provider puts on its rate-limit notice.
const RATE_LIMIT_AUTHOR: &str = "zenquotes.io";

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    q: String,
    #[serde(default)]
    a: String,
}

pub fn parse_body(body: &str, category: Option<Category>) -> Result<Quote, SourceError> {
    let items: Vec<Item> = parse_json(body)?;
    let item = items.into_iter().next().ok_or(SourceError::Empty)?;
    if item.a.trim().eq_ignore_ascii_case(RATE_LIMIT_AUTHOR) {
        return Err(SourceError::Malformed(format!("rate limited: {}", item.q.trim())));
    }
    let q = Quote::new(&item.q, &item.a, SourceId::Zenquotes).ok_or(SourceError::Empty)?;
    let tags = infer_tags(&q.text, category);
    Ok(q.with_tags(tags))
}

pub struct ZenQuotesSource {
    client: reqwest::Client,
    base_url: String,
}

impl ZenQuotesSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for ZenQuotesSource {
    fn id(&self) -> SourceId {
        SourceId::Zenquotes
    }

    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError> {
        let url = format!("{}/api/random", self.base_url);
        let body = get_text(&self.client, &url).await?;
        parse_body(&body, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_item() {
        let body = r#"[{"q":"Happiness is a choice.","a":"Unknown Monk","h":"<blockquote/>"}]"#;
        let q = parse_body(body, None).unwrap();
        assert_eq!(q.text, "Happiness is a choice.");
        assert!(q.has_tag("happiness"));
    }

    #[test]
    fn rate_limit_notice_is_malformed() {
        let body = r#"[{"q":"Too many requests. Obtain an auth key for unlimited access.","a":"zenquotes.io"}]"#;
        assert!(matches!(parse_body(body, None), Err(SourceError::Malformed(_))));
    }
}
