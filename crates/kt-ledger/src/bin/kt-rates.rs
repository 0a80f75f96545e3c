//! # Rate Check
//!
//! Prints today's to-EUR rates through the full provider stack: cache,
//! stored rows, then the external API.
//!
//! ## Usage
//! ```bash
//! # All supported currencies
//! KT_RATES_API_KEY=... cargo run -p kt-ledger --bin kt-rates
//!
//! # Only some, with an explicit config file
//! cargo run -p kt-ledger --bin kt-rates -- --config ./kt.toml HUF GBP
//!
//! # Drop stored rates older than 90 days afterwards
//! cargo run -p kt-ledger --bin kt-rates -- --prune 90
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kt_core::Currency;
use kt_db::Database;
use kt_ledger::clock::{Clock, SystemClock};
use kt_ledger::rates::{ExchangeRateApi, MemoryCache, RateProvider};
use kt_ledger::LedgerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut prune_days: Option<u32> = None;
    let mut currencies: Vec<Currency> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-p" | "--prune" => {
                if i + 1 < args.len() {
                    prune_days = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("KT Back Office Rate Check");
                println!();
                println!("Usage: kt-rates [OPTIONS] [CURRENCY ...]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -p, --prune <DAYS>   Remove stored rates older than DAYS");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            code => currencies.push(code.parse()?),
        }
        i += 1;
    }

    if currencies.is_empty() {
        currencies = Currency::foreign().collect();
    }

    let config = LedgerConfig::load(config_path)?;
    let db = Database::new(config.db_config()).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(MemoryCache::new(Arc::clone(&clock)));
    let source = ExchangeRateApi::new(&config.rates)?;
    let provider = RateProvider::new(source, cache, clock, db.clone());

    let mut failed = false;
    for currency in currencies {
        match provider.get_rate(currency).await {
            Ok(rate) => println!("1 {currency} = {rate} EUR"),
            Err(e) => {
                error!(currency = %currency, error = %e, "Rate lookup failed");
                failed = true;
            }
        }
    }

    if let Some(days) = prune_days {
        let removed = provider.prune_history(days).await?;
        info!(removed, "Pruned stored rates");
    }

    db.close().await;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kt=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
