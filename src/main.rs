use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geotally::config::{Config, LookupMode};
use geotally::counter::CounterStore;
use geotally::geoip::{CountryLookup, GeoIpError};

#[derive(Parser)]
#[command(name = "geotally")]
#[command(about = "Visitor country lookup and counter", long_about = None)]
struct Cli {
    /// Range table CSV (overrides GEOTALLY_RANGE_TABLE)
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// Counter JSON file (overrides GEOTALLY_DATA_FILE)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Lookup strategy: scan or indexed (overrides GEOTALLY_LOOKUP_MODE)
    #[arg(long, global = true, value_parser = parse_mode)]
    mode: Option<LookupMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the country code for an address
    Lookup {
        /// IPv4 or IPv6 address
        address: String,
    },
    /// Classify an address and add one visit to the counter file
    Record {
        /// IPv4 or IPv6 address
        address: String,
    },
    /// Show visit counts by country
    Stats {
        /// Only show the N most visited countries
        #[arg(long)]
        top: Option<usize>,
    },
}

fn parse_mode(value: &str) -> Result<LookupMode, String> {
    LookupMode::parse(value).ok_or_else(|| format!("unknown mode '{value}' (expected scan or indexed)"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    if let Some(table) = cli.table {
        config.geoip.range_table = table;
    }
    if let Some(data) = cli.data {
        config.counter.data_file = data;
    }
    if let Some(mode) = cli.mode {
        config.geoip.mode = mode;
    }

    match cli.command {
        Commands::Lookup { address } => {
            let country = lookup_country(&config, address).await?;
            println!("{country}");
        }
        Commands::Record { address } => {
            let country = match lookup_country(&config, address.clone()).await {
                Ok(country) => country,
                Err(e) => {
                    if matches!(
                        e.downcast_ref::<GeoIpError>(),
                        Some(GeoIpError::SourceUnavailable { .. })
                    ) {
                        println!("{}", json!({"ok": false, "error": "range table not found"}));
                        return Ok(ExitCode::FAILURE);
                    }
                    return Err(e);
                }
            };

            let store = CounterStore::new(&config.counter.data_file);
            let outcome = match store.record(&country).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Failed to record visit: {:#}", e);
                    println!("{}", json!({"ok": false, "error": "failed to save counter file"}));
                    return Ok(ExitCode::FAILURE);
                }
            };

            info!(country = %outcome.country, total = outcome.total, "recorded visit");
            println!(
                "{}",
                json!({
                    "ok": true,
                    "ip": address,
                    "country": outcome.country,
                    "total": outcome.total,
                })
            );
        }
        Commands::Stats { top } => {
            let store = CounterStore::new(&config.counter.data_file);
            let counts = store.load().await;
            let ranked = counts.ranked();

            if ranked.is_empty() {
                println!("No visits recorded yet.");
            } else {
                println!("{:<10} {}", "Country", "Visits");
                println!("{}", "-".repeat(20));
                for (code, count) in ranked.iter().take(top.unwrap_or(usize::MAX)) {
                    println!("{:<10} {}", code, count);
                }
                println!("{}", "-".repeat(20));
                println!("{:<10} {}", "Total", counts.total());
            }
            if let Some(updated) = counts.last_updated.as_deref() {
                println!("Last updated: {updated}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Classify off the async runtime; table loading and scanning block on file I/O
async fn lookup_country(config: &Config, address: String) -> Result<String> {
    let geoip = config.geoip.clone();
    let country = tokio::task::spawn_blocking(move || {
        let lookup = CountryLookup::from_config(&geoip)?;
        info!(
            table = %geoip.range_table.display(),
            mode = ?lookup.mode(),
            "classifying address"
        );
        lookup.country_for(&address)
    })
    .await
    .context("Lookup task panicked")??;

    Ok(country)
}
