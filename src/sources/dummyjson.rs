//! dummyjson.com: random quote, no categories.

use async_trait::async_trait;
use serde::Deserialize;

use super::{get_text, parse_json, QuoteSource, SourceError};
use crate::quote::{Category, Quote, SourceId};
use crate::tagging::infer_tags;

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    quote: String,
    #[serde(default)]
    author: String,
}

pub fn parse_body(body: &str, category: Option<Category>) -> Result<Quote, SourceError> {
    let p: Payload = parse_json(body)?;
    let q = Quote::new(&p.quote, &p.author, SourceId::Dummyjson).ok_or(SourceError::Empty)?;
    let tags = infer_tags(&q.text, category);
    Ok(q.with_tags(tags))
}

pub struct DummyJsonSource {
    client: reqwest::Client,
    base_url: String,
}

impl DummyJsonSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for DummyJsonSource {
    fn id(&self) -> SourceId {
        SourceId::Dummyjson
    }

    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError> {
        let url = format!("{}/quotes/random", self.base_url);
        let body = get_text(&self.client, &url).await?;
        parse_body(&body, category)
    }
}
