//! # Points per matchday
//!
//! Fetches the market analytics page (or reads a saved copy), picks the
//! players table and writes the long and pivot CSV exports.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use player_scraper::columns::normalize_columns;
use player_scraper::export::{aggregate, write_long_csv, write_pivot_csv, Pivot};
use player_scraper::logging::initialize_logging_with_config;
use player_scraper::long_format::to_long_format;
use player_scraper::table::{parse_tables, select_players_table};
use player_scraper::{MarketPageFetcher, ScraperConfig};

/// Extract points per matchday from the market analytics table
#[derive(Parser)]
#[command(name = "scrape_points")]
#[command(about = "Export LaLiga Fantasy points per matchday to CSV")]
struct Cli {
    /// Process a saved, rendered page instead of fetching
    #[arg(long)]
    html: Option<PathBuf>,

    /// Page URL (defaults to FANTASY_MARKET_URL or the market page)
    #[arg(long)]
    url: Option<String>,

    /// Long export path
    #[arg(long)]
    long_csv: Option<PathBuf>,

    /// Pivot export path
    #[arg(long)]
    pivot_csv: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: compact, pretty or json
    #[arg(long, default_value = "compact")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging_with_config(&cli.log_level, &cli.log_format)?;

    let config = ScraperConfig::from_env()?;

    info!("Starting points-per-matchday extraction");

    let html = match &cli.html {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read saved page {}", path.display()))?,
        None => {
            let url = cli.url.as_deref().unwrap_or(&config.request.market_url);
            let fetcher = MarketPageFetcher::new(&config.request)?;
            fetcher.fetch_html(url).await?
        }
    };

    let tables = parse_tables(&html)?;
    let table = select_players_table(&tables).map_err(|e| {
        error!("No players table on the page: {}", e);
        e
    })?;

    let normalized = normalize_columns(table);
    let long_rows =
        to_long_format(&normalized).context("Could not reshape the table to long format")?;

    let aggregated = aggregate(&long_rows);
    let pivot = Pivot::from_rows(&aggregated);

    let long_path = cli.long_csv.unwrap_or_else(|| PathBuf::from(&config.output.long_csv));
    let pivot_path = cli.pivot_csv.unwrap_or_else(|| PathBuf::from(&config.output.pivot_csv));
    write_long_csv(&long_path, &aggregated)?;
    write_pivot_csv(&pivot_path, &pivot)?;

    let header: String = pivot.matchdays.iter().map(|md| format!("J{md:<5}")).collect();
    println!("\n{:<28} {}", "Jugador", header);
    println!("{}", "-".repeat(28 + pivot.matchdays.len() * 6));
    for (player, cells) in pivot.rows.iter().take(10) {
        let cells: String = cells
            .iter()
            .map(|cell| match cell {
                Some(points) => format!("{points:<6}"),
                None => format!("{:<6}", "-"),
            })
            .collect();
        println!("{player:<28} {cells}");
    }

    info!("Extraction completed: {} rows, {} players", aggregated.len(), pivot.player_count());
    Ok(())
}
