//! Points-history enrichment for market cards.
//!
//! Cards usually carry a partial history in their attributes. In points
//! mode a card whose attributes only cover the first matchday (or nothing)
//! is completed through a [`HistoryLookup`], one bounded call per player.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cards::MarketCard;
use crate::config::PlayerApiConfig;
use crate::history::{dedupe_points_history, parse_points_history, Payload};
use crate::types::{EnrichmentMode, PointsHistoryEntry};

/// Attribute-name fragments that mark a history-bearing attribute
const HISTORY_ATTR_HINTS: [&str; 5] = ["punto", "point", "jorn", "match", "score"];

/// Source of full per-player histories
#[async_trait]
pub trait HistoryLookup: Send + Sync {
    /// Fetch the history of one player; an empty series means "unknown"
    async fn lookup(&self, player_id: i64) -> Result<Vec<PointsHistoryEntry>>;
}

/// Player-detail API client
pub struct PlayerApiClient {
    client: Client,
    base_url: String,
    competition: String,
}

impl PlayerApiClient {
    pub fn new(config: &PlayerApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            competition: config.competition.clone(),
        })
    }

    pub fn player_url(&self, player_id: i64) -> String {
        format!("{}/{}?competition={}", self.base_url, player_id, self.competition)
    }
}

#[async_trait]
impl HistoryLookup for PlayerApiClient {
    async fn lookup(&self, player_id: i64) -> Result<Vec<PointsHistoryEntry>> {
        let url = self.player_url(player_id);
        debug!("Requesting history from {}", url);

        let response = self.client.get(&url).send().await.context("Failed to reach player API")?;
        if !response.status().is_success() {
            anyhow::bail!("player API returned status {}", response.status());
        }

        let body = response.text().await.context("Failed to read player API body")?;
        Ok(parse_api_body(&body))
    }
}

/// Parse an API body as JSON, or as loose text when it is not JSON
pub fn parse_api_body(body: &str) -> Vec<PointsHistoryEntry> {
    let payload = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => Payload::from(value),
        Err(_) => Payload::from(body),
    };
    parse_points_history(&payload)
}

/// Resolves the points history of a card under an explicit mode
pub struct HistoryEnricher {
    lookup: Option<Box<dyn HistoryLookup>>,
    lookup_timeout: Duration,
}

impl HistoryEnricher {
    pub fn new(lookup: Box<dyn HistoryLookup>, lookup_timeout: Duration) -> Self {
        Self { lookup: Some(lookup), lookup_timeout }
    }

    /// Enricher that never leaves the card attributes
    pub fn attributes_only() -> Self {
        Self { lookup: None, lookup_timeout: Duration::ZERO }
    }

    /// History readable from the card attributes and nested datasets
    pub fn attribute_history(card: &MarketCard) -> Vec<PointsHistoryEntry> {
        let mut entries = Vec::new();

        for (name, value) in &card.attributes {
            let lowered = name.to_lowercase();
            if !lowered.starts_with("data-") || value.is_empty() {
                continue;
            }
            if HISTORY_ATTR_HINTS.iter().any(|hint| lowered.contains(hint)) {
                entries.extend(parse_points_history(&Payload::from(value.as_str())));
            }
        }

        for dataset in &card.datasets {
            let payload: Payload = dataset.iter().cloned().collect();
            entries.extend(parse_points_history(&payload));
        }

        dedupe_points_history(entries)
    }

    /// History for one card. `label` only feeds log lines.
    pub async fn history_for(
        &self,
        card: &MarketCard,
        label: &str,
        mode: EnrichmentMode,
    ) -> Vec<PointsHistoryEntry> {
        let attr_history = Self::attribute_history(card);

        if mode == EnrichmentMode::Market {
            return attr_history;
        }

        let max_matchday = attr_history.iter().map(|e| e.matchday).max().unwrap_or(0);
        if attr_history.len() > 1 || max_matchday > 1 {
            return attr_history;
        }

        let (Some(lookup), Some(player_id)) = (self.lookup.as_ref(), card.player_id) else {
            return attr_history;
        };

        info!("Fetching points history for {}", label);
        match timeout(self.lookup_timeout, lookup.lookup(player_id)).await {
            Ok(Ok(history)) if !history.is_empty() => dedupe_points_history(history),
            Ok(Ok(_)) => {
                debug!("Lookup returned no history for {}", label);
                attr_history
            }
            Ok(Err(e)) => {
                warn!("History lookup failed for {}: {:#}", label, e);
                attr_history
            }
            Err(_) => {
                warn!("History lookup timed out for {} after {:?}", label, self.lookup_timeout);
                attr_history
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubLookup {
        calls: Arc<AtomicUsize>,
        history: Vec<PointsHistoryEntry>,
        delay: Duration,
    }

    #[async_trait]
    impl HistoryLookup for StubLookup {
        async fn lookup(&self, _player_id: i64) -> Result<Vec<PointsHistoryEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.history.clone())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl HistoryLookup for FailingLookup {
        async fn lookup(&self, _player_id: i64) -> Result<Vec<PointsHistoryEntry>> {
            anyhow::bail!("connection refused")
        }
    }

    fn entry(matchday: u32, points: f64) -> PointsHistoryEntry {
        PointsHistoryEntry { matchday, points }
    }

    fn stub(delay: Duration) -> (HistoryEnricher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let history = vec![entry(1, 3.0), entry(2, 8.0)];
        let lookup = StubLookup { calls: calls.clone(), history, delay };
        (HistoryEnricher::new(Box::new(lookup), Duration::from_millis(50)), calls)
    }

    fn card(attrs: &[(&str, &str)]) -> MarketCard {
        MarketCard {
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            player_id: Some(8405),
            ..Default::default()
        }
    }

    #[test]
    fn test_attribute_history_reads_hinted_attributes_only() {
        let card = card(&[
            ("data-puntos", "J1: 6 | J3: 2"),
            ("data-valor", "J2: 9"),
            ("title", "J4: 1"),
        ]);
        assert_eq!(HistoryEnricher::attribute_history(&card), vec![entry(1, 6.0), entry(3, 2.0)]);
    }

    #[test]
    fn test_attribute_history_includes_datasets() {
        let mut card = card(&[]);
        card.datasets = vec![vec![("jornada".into(), "4".into()), ("puntos".into(), "7".into())]];
        assert_eq!(HistoryEnricher::attribute_history(&card), vec![entry(4, 7.0)]);
    }

    #[tokio::test]
    async fn test_market_mode_never_calls_lookup() {
        let (enricher, calls) = stub(Duration::ZERO);
        let history = enricher.history_for(&card(&[]), "test", EnrichmentMode::Market).await;
        assert!(history.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_points_mode_uses_lookup_for_thin_history() {
        let (enricher, calls) = stub(Duration::ZERO);
        let card = card(&[("data-puntos", "J1: 5")]);
        let history = enricher.history_for(&card, "test", EnrichmentMode::Points).await;
        assert_eq!(history, vec![entry(1, 3.0), entry(2, 8.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_points_mode_keeps_rich_attribute_history() {
        let (enricher, calls) = stub(Duration::ZERO);
        let card = card(&[("data-puntos", "J3: 5")]);
        let history = enricher.history_for(&card, "test", EnrichmentMode::Points).await;
        assert_eq!(history, vec![entry(3, 5.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_points_mode_falls_back_on_timeout() {
        let (enricher, calls) = stub(Duration::from_secs(5));
        let card = card(&[("data-puntos", "J1: 5")]);
        let history = enricher.history_for(&card, "test", EnrichmentMode::Points).await;
        assert_eq!(history, vec![entry(1, 5.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_points_mode_falls_back_on_error() {
        let enricher = HistoryEnricher::new(Box::new(FailingLookup), Duration::from_secs(1));
        let history = enricher.history_for(&card(&[]), "test", EnrichmentMode::Points).await;
        assert!(history.is_empty());
    }

    #[test]
    fn test_parse_api_body() {
        let json = r#"{
            "playerStats": [{"weekNumber": 1}],
            "history": [{"jornada": 1, "puntos": 4}, {"jornada": 2, "puntos": -1}]
        }"#;
        assert_eq!(parse_api_body(json), vec![entry(1, 4.0), entry(2, -1.0)]);
        assert_eq!(parse_api_body("J5: 3"), vec![entry(5, 3.0)]);
    }

    #[test]
    fn test_player_url() {
        let mut config = crate::config::ScraperConfig::default().player_api;
        config.base_url.push('/');
        let client = PlayerApiClient::new(&config).unwrap();
        assert_eq!(
            client.player_url(8405),
            "https://www.laligafantasymarca.com/api/v3/player/8405?competition=laliga-fantasy"
        );
    }
}
