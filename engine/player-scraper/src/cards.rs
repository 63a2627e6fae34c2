//! Market-card parsing and per-card record extraction.
//!
//! The market page lists one `div.elemento_jugador` per player. Almost
//! everything lives in `data-*` attributes on the card; the visible name
//! and team text are used as fallbacks.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::enrichment::HistoryEnricher;
use crate::error::{ExtractError, Result};
use crate::history;
use crate::name::{clean_name, has_adjacent_repeat, name_key, normalize_whitespace};
use crate::numeric::{to_float, to_int_opt};
use crate::types::{
    EnrichmentMode, PlayerId, PlayerRecord, PointsHistoryEntry, ValueWindow, VALUE_WINDOWS,
};

/// Selector for player cards on the market page
pub const CARD_SELECTOR: &str = "div.lista_elementos div.elemento_jugador";

static ONCLICK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([0-9]+)\s*\)\s*;").unwrap());

const AVG_ATTRS: &[&str] = &[
    "data-media",
    "data-media-total",
    "data-media_jornada",
    "data-mediajornada",
    "data-mediajornadas",
    "data-media-puntos",
    "data-promedio",
    "data-puntos",
];

const LAST5_ATTRS: &[&str] = &[
    "data-media5",
    "data-media-5",
    "data-media5partidos",
    "data-media5p",
    "data-media_reciente",
    "data-media-reciente",
    "data-mediaultimos5",
    "data-media-ultimos5",
    "data-ultimos5",
    "data-ult5",
    "data-puntos5",
];

const TOTAL_ATTRS: &[&str] = &[
    "data-puntos-total",
    "data-puntos_total",
    "data-puntos-totales",
    "data-puntos_totales",
    "data-total-puntos",
    "data-total_puntos",
    "data-totalpuntos",
    "data-puntos-temporada",
    "data-puntos-season",
    "data-puntos_temporada",
];

/// Raw data captured from one market card
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketCard {
    /// Every attribute of the card element
    pub attributes: Vec<(String, String)>,
    /// Player id from the card's `onclick` handler
    pub player_id: Option<i64>,
    /// Text of `.datos-nombre`
    pub visible_name: String,
    /// Text of `.equipo span`
    pub visible_team: String,
    /// `data-*` maps (prefix stripped) of the card and its descendants,
    /// breadth-first
    pub datasets: Vec<Vec<(String, String)>>,
}

impl MarketCard {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// First non-empty attribute among `names`
    pub fn first_attr(&self, names: &[&str]) -> Option<&str> {
        names.iter().filter_map(|name| self.attr(name)).find(|v| !v.is_empty())
    }
}

/// Parse every market card in a rendered page.
pub fn parse_cards(html: &str) -> Result<Vec<MarketCard>> {
    let document = Html::parse_document(html);
    let card_selector = parse_selector(CARD_SELECTOR)?;
    let name_selector = parse_selector(".datos-nombre")?;
    let team_selector = parse_selector(".equipo span")?;

    let cards: Vec<MarketCard> = document
        .select(&card_selector)
        .map(|card| {
            let attributes: Vec<(String, String)> =
                card.value().attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            let player_id = card
                .value()
                .attr("onclick")
                .and_then(|onclick| ONCLICK_ID.captures(onclick))
                .and_then(|c| c[1].parse::<i64>().ok());
            let visible_name = first_text(card, &name_selector);
            let visible_team = first_text(card, &team_selector);

            MarketCard {
                attributes,
                player_id,
                visible_name,
                visible_team,
                datasets: collect_datasets(card),
            }
        })
        .collect();

    info!("Detected {} player cards", cards.len());
    Ok(cards)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::selector(format!("failed to parse '{selector}': {e}")))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(root: ElementRef, selector: &Selector) -> String {
    root.select(selector).next().map(|el| element_text(&el)).unwrap_or_default()
}

fn collect_datasets(root: ElementRef) -> Vec<Vec<(String, String)>> {
    let mut datasets = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        let dataset: Vec<(String, String)> = node
            .value()
            .attrs()
            .filter_map(|(k, v)| {
                k.strip_prefix("data-").map(|key| (key.to_string(), v.to_string()))
            })
            .collect();
        if !dataset.is_empty() {
            datasets.push(dataset);
        }
        queue.extend(node.children().filter_map(ElementRef::wrap));
    }

    datasets
}

/// Restricts extraction to explicit ids and approximate names.
///
/// Targets are consumed as they are found; once none remain the extraction
/// stops.
#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    remaining_ids: HashSet<i64>,
    remaining_names: HashSet<String>,
}

impl TargetFilter {
    pub fn new(
        ids: impl IntoIterator<Item = i64>,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            remaining_ids: ids.into_iter().collect(),
            remaining_names: names.into_iter().filter_map(|n| name_key(n.as_ref())).collect(),
        }
    }

    /// True when any target was given
    pub fn is_active(&self) -> bool {
        !self.remaining_ids.is_empty() || !self.remaining_names.is_empty()
    }

    /// Consume the targets matching this card; false if none do
    fn claim(&mut self, id: Option<i64>, key: Option<&str>) -> bool {
        let by_id = id.is_some_and(|id| self.remaining_ids.remove(&id));
        let by_name = key.is_some_and(|key| self.remaining_names.remove(key));
        by_id || by_name
    }

    fn is_exhausted(&self) -> bool {
        self.remaining_ids.is_empty() && self.remaining_names.is_empty()
    }
}

/// Turns market cards into player records
pub struct MarketExtractor<'a> {
    enricher: &'a HistoryEnricher,
    mode: EnrichmentMode,
    history_cache: HashMap<i64, Vec<PointsHistoryEntry>>,
}

impl<'a> MarketExtractor<'a> {
    pub fn new(enricher: &'a HistoryEnricher, mode: EnrichmentMode) -> Self {
        Self { enricher, mode, history_cache: HashMap::new() }
    }

    /// Extract records for every card, or only for the filter's targets.
    pub async fn extract(
        &mut self,
        cards: &[MarketCard],
        filter: Option<TargetFilter>,
    ) -> Vec<PlayerRecord> {
        let mut filter = filter.filter(TargetFilter::is_active);
        let mut players = Vec::new();

        for (idx, card) in cards.iter().enumerate() {
            let name = self.resolve_name(card);

            if let Some(filter) = filter.as_mut() {
                let key = name_key(&name);
                if !filter.claim(card.player_id, key.as_deref()) {
                    continue;
                }
            }

            let record = self.extract_card(card, name).await;
            debug!(
                "Player {}/{}: {} | {:?} €",
                idx + 1,
                cards.len(),
                record.describe(),
                record.value
            );
            players.push(record);

            if filter.as_ref().is_some_and(TargetFilter::is_exhausted) {
                info!("All requested players found, stopping early");
                break;
            }
        }

        info!("Extracted {} players ({} mode)", players.len(), self.mode);
        players
    }

    /// Cleaned `data-nombre`/`data-name`, else the cleaned visible text
    fn resolve_name(&self, card: &MarketCard) -> String {
        let from_attr =
            card.first_attr(&["data-nombre", "data-name"]).map(clean_name).unwrap_or_default();
        let from_text = clean_name(&card.visible_name);

        let both_present = !from_attr.is_empty() && !from_text.is_empty();
        if both_present && from_attr.to_lowercase() != from_text.to_lowercase() {
            warn!("data-nombre differs from visible text: '{}' vs '{}'", from_attr, from_text);
        }

        let name = if from_attr.is_empty() { from_text } else { from_attr };
        if has_adjacent_repeat(&name) {
            debug!("Possible repetition left in normalized name: {}", name);
        }
        name
    }

    async fn extract_card(&mut self, card: &MarketCard, name: String) -> PlayerRecord {
        let mut record = PlayerRecord {
            id: card.player_id.map(PlayerId::from),
            name,
            team_id: non_empty(card.attr("data-equipo")),
            team: non_empty(Some(card.visible_team.as_str())),
            position: non_empty(card.attr("data-posicion")),
            value: Some(to_int_opt(card.attr("data-valor"))),
            points_avg: card.first_attr(AVG_ATTRS).and_then(to_float),
            points_last5: card.first_attr(LAST5_ATTRS).and_then(to_float),
            points_total: card.first_attr(TOTAL_ATTRS).and_then(to_float),
            ..Default::default()
        };

        for days in VALUE_WINDOWS {
            record.windows.insert(
                days,
                ValueWindow {
                    value: to_int_opt(card.attr(&format!("data-valor{days}"))),
                    diff: to_int_opt(card.attr(&format!("data-diferencia{days}"))),
                    diff_pct: card
                        .attr(&format!("data-diferencia-pct{days}"))
                        .and_then(to_float)
                        .unwrap_or(0.0),
                },
            );
        }

        let history = self.history_for(card, &record).await;

        if record.points_avg.is_none() {
            record.points_avg = history::average(&history, None);
        }
        if record.points_last5.is_none() {
            record.points_last5 = history::average(&history, Some(5));
        }
        if record.points_total.is_none() {
            record.points_total = history::total(&history);
        }

        // An empty market-mode history means "not observed", not "no points"
        if !history.is_empty() || self.mode == EnrichmentMode::Points {
            record.points_history = Some(history);
        }
        record
    }

    async fn history_for(
        &mut self,
        card: &MarketCard,
        record: &PlayerRecord,
    ) -> Vec<PointsHistoryEntry> {
        if let Some(cached) = card.player_id.and_then(|id| self.history_cache.get(&id)) {
            return cached.clone();
        }
        let history = self.enricher.history_for(card, &record.describe(), self.mode).await;
        if let Some(id) = card.player_id {
            self.history_cache.insert(id, history.clone());
        }
        history
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(normalize_whitespace).filter(|s| !s.is_empty())
}
