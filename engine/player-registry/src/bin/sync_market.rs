//! # Market sync
//!
//! Reads every player card of the market page and writes `market.json`.
//! With `--player-id`/`--player-name` only those players are refreshed and
//! merged into the existing store.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use player_registry::PlayerRegistry;
use player_scraper::logging::initialize_logging_with_config;
use player_scraper::{
    parse_cards, EnrichmentMode, HistoryEnricher, MarketExtractor, MarketPageFetcher,
    PlayerApiClient, ScraperConfig, TargetFilter,
};

/// Sync the LaLiga Fantasy market into the local player store
#[derive(Parser)]
#[command(name = "sync_market")]
#[command(about = "Extract market players and persist them to market.json")]
struct Cli {
    /// `market` reads values only, `points` also resolves points histories
    #[arg(long, value_enum, default_value_t = EnrichmentMode::Market)]
    mode: EnrichmentMode,

    /// Player id to refresh (repeatable)
    #[arg(long = "player-id")]
    player_ids: Vec<i64>,

    /// Approximate player name to refresh (repeatable)
    #[arg(long = "player-name")]
    player_names: Vec<String>,

    /// Process a saved, rendered page instead of fetching
    #[arg(long)]
    html: Option<PathBuf>,

    /// Page URL (defaults to FANTASY_MARKET_URL or the market page)
    #[arg(long)]
    url: Option<String>,

    /// Store path (defaults to FANTASY_STORE_PATH or market.json)
    #[arg(long)]
    store: Option<PathBuf>,

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
    let store_path = cli.store.clone().unwrap_or_else(|| PathBuf::from(&config.output.store_path));

    match cli.mode {
        EnrichmentMode::Points => info!("Points mode: player histories will be resolved"),
        EnrichmentMode::Market => info!("Market mode: detailed history lookup is skipped"),
    }

    let html = match &cli.html {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read saved page {}", path.display()))?,
        None => {
            let url = cli.url.as_deref().unwrap_or(&config.request.market_url);
            MarketPageFetcher::new(&config.request)?.fetch_html(url).await?
        }
    };

    let cards = parse_cards(&html)?;
    if cards.is_empty() {
        anyhow::bail!("No player cards found on the market page");
    }

    let api = PlayerApiClient::new(&config.player_api)?;
    let lookup_timeout = Duration::from_secs(config.player_api.timeout_secs);
    let enricher = HistoryEnricher::new(Box::new(api), lookup_timeout);
    let mut extractor = MarketExtractor::new(&enricher, cli.mode);

    let filter = TargetFilter::new(cli.player_ids.iter().copied(), &cli.player_names);
    let filtering = filter.is_active();
    let players = extractor.extract(&cards, Some(filter)).await;

    let mut registry = PlayerRegistry::load(&store_path).await;

    if filtering {
        if registry.load_failed() {
            anyhow::bail!(
                "{} exists but could not be loaded; fix it or run a full sync",
                store_path.display()
            );
        }
        if players.is_empty() && registry.is_empty() {
            warn!("No players matched the requested ids/names and no previous store exists");
            return Ok(());
        }
        let updated = registry.merge_updates(players, cli.mode);
        if updated == 0 {
            info!("No stored player changed for the requested ids/names");
        }
    } else {
        registry.replace(players, cli.mode);
    }

    registry.save(&store_path).await?;
    println!("Saved {} players to {}", registry.player_count(), store_path.display());
    Ok(())
}
