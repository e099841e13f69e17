// src/sources/forismatic.rs
//! forismatic.com: random Russian-language quote, no category support.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use serde::Deserialize;

use super::{get_text, parse_json, QuoteSource, SourceError};
use crate::quote::{Category, Quote, SourceId};
use crate::tagging::infer_tags;

const PATH: &str = "/api/1.0/?method=getQuote&format=json&lang=ru";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    quote_text: String,
    #[serde(default)]
    quote_author: String,
}

/// The API emits escapes JSON does not allow (`\'` mostly). Drop the
/// backslash from those and keep the valid ones intact.
fn repair_escapes(body: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r#"\\(["\\/bfnrtu])|\\(.)"#).unwrap());
    re.replace_all(body, |c: &Captures| match (c.get(1), c.get(2)) {
        (Some(valid), _) => format!("\\{}", valid.as_str()),
        (None, Some(other)) => other.as_str().to_string(),
        _ => String::new(),
    })
}

/// Parse a response body into a quote.
pub fn parse_body(body: &str, category: Option<Category>) -> Result<Quote, SourceError> {
    let p: Payload = parse_json(&repair_escapes(body))?;
    let q = Quote::new(&p.quote_text, &p.quote_author, SourceId::Forismatic)
        .ok_or(SourceError::Empty)?;
    let tags = infer_tags(&q.text, category);
    Ok(q.with_tags(tags))
}

pub struct ForismaticSource {
    client: reqwest::Client,
    base_url: String,
}

impl ForismaticSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for ForismaticSource {
    fn id(&self) -> SourceId {
        SourceId::Forismatic
    }

    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError> {
        let url = format!("{}{}", self.base_url, PATH);
        let body = get_text(&self.client, &url).await?;
        parse_body(&body, category)
    }
}
