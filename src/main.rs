//! pricewatch — scheduled marketplace price estimation
//!
//! Entry point. Loads configuration, initialises structured logging,
//! reads the search terms, and runs the wait→scan→record loop until
//! Ctrl+C (or a single scan in test mode).

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use pricewatch::cli::Cli;
use pricewatch::config::AppConfig;
use pricewatch::engine::clock::{Clock, SystemClock};
use pricewatch::engine::scanner::Scanner;
use pricewatch::engine::scheduler::Scheduler;
use pricewatch::sources::ebay::EbayClient;
use pricewatch::sources::terms::load_search_terms;
use pricewatch::sources::QuoteSource;
use pricewatch::storage::JsonResultStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let mut cfg = AppConfig::load_or_default(&cli.config)?;
    cli.apply(&mut cfg);
    cfg.validate().context("Invalid configuration")?;

    let terms = load_search_terms(&cfg.items_path)?;

    let source = EbayClient::new(&cfg.source)?;
    info!(
        source = source.name(),
        items = terms.len(),
        interval_minutes = cfg.schedule.interval_minutes,
        test_mode = cfg.schedule.test_mode,
        output_dir = %cfg.storage.output_dir.display(),
        "pricewatch starting up"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scanner = Scanner::new(
        Box::new(source),
        Box::new(JsonResultStore::new(cfg.storage.output_dir.clone())),
        clock.clone(),
        cfg.estimation_parameters()?,
        cfg.schedule.pacing(),
    );
    let mut scheduler = Scheduler::new(scanner, clock, terms, &cfg.schedule)?;

    if scheduler.is_test_mode() {
        scheduler.run().await;
        return Ok(());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::select! {
        _ = scheduler.run() => {}
        _ = shutdown => {
            info!("Shutdown signal received.");
        }
    }

    let state = scheduler.state();
    info!(
        attempts = state.attempt_count,
        successes = state.success_count,
        failures = state.failure_count,
        "pricewatch shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pricewatch=info"));

    let json_logging = std::env::var("PRICEWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
