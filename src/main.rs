//! Quote aggregator daemon.
//! Loads configuration, seeds the store and runs the scheduled jobs until Ctrl-C.

use anyhow::{Context, Result};
use quote_aggregator::{config, metrics::Metrics, App};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; JSON lines when `QUOTES_LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quote_aggregator=info,warn"));

    let json = std::env::var("QUOTES_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading configuration")?;
    let _metrics = Metrics::install(cfg.metrics.listen)?;
    if let Some(addr) = cfg.metrics.listen {
        tracing::info!(%addr, "prometheus listener started");
    }

    let app = App::build(cfg).await?;
    let seeded = app.seed().await?;
    if seeded > 0 {
        tracing::info!(seeded, "store seeded");
    }

    let handles = app.start_scheduler()?;
    tracing::info!(jobs = handles.len(), "quote aggregator running");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    for h in handles {
        h.abort();
    }
    Ok(())
}
