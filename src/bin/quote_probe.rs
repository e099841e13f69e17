// src/bin/quote_probe.rs
// One-shot: fetch an aggregated quote (and optionally the daily pick) and print it as JSON.
//
// Usage: quote-probe [--daily] [--metrics] [Category]

use anyhow::{bail, Context, Result};
use quote_aggregator::{config, metrics::Metrics, App, Category, QuoteQuery};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    let mut daily = false;
    let mut show_metrics = false;
    let mut category: Option<Category> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--daily" => daily = true,
            "--metrics" => show_metrics = true,
            "-h" | "--help" => {
                println!("usage: quote-probe [--daily] [--metrics] [Category]");
                return Ok(());
            }
            other => {
                let c: Category = other.parse().map_err(anyhow::Error::msg)?;
                category = Some(c);
            }
        }
    }
    if daily && category.is_none() {
        bail!("--daily needs a category");
    }

    let cfg = config::load_default().context("loading configuration")?;
    let recorder = if show_metrics {
        Some(Metrics::install(None)?)
    } else {
        None
    };
    let app = App::build(cfg).await?;

    let quote = app.aggregator.get_quote(&QuoteQuery::new(category)).await;
    println!("{}", serde_json::to_string_pretty(&quote)?);

    if let (true, Some(c)) = (daily, category) {
        let pick = app.daily.get_daily_quote(c).await;
        println!("{}", serde_json::to_string_pretty(&pick)?);
    }
    if let Some(m) = recorder {
        eprintln!("{}", m.render());
    }
    Ok(())
}
