//! # Player Scraper
//!
//! Extraction of LaLiga Fantasy player data from rendered market pages.
//!
//! Two independent paths share the same text primitives:
//!
//! - the table path picks the players table among every `<table>` on a
//!   points page, canonicalizes its columns and reshapes it into one row per
//!   player and matchday ([`table`], [`columns`], [`long_format`], [`export`]);
//! - the card path reads one record per market card, with a cleaned name
//!   and a normalized points history ([`cards`], [`enrichment`]).

pub mod cards;
pub mod columns;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod history;
pub mod logging;
pub mod long_format;
pub mod name;
pub mod numeric;
pub mod table;
pub mod types;

pub use cards::{parse_cards, MarketCard, MarketExtractor, TargetFilter};
pub use config::ScraperConfig;
pub use enrichment::{HistoryEnricher, HistoryLookup, PlayerApiClient};
pub use error::{ExtractError, Result};
pub use fetcher::MarketPageFetcher;
pub use types::{
    EnrichmentMode, PlayerId, PlayerRecord, PointsHistoryEntry, ValueWindow, ValueWindows,
};
