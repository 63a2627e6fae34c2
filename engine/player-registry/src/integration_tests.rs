//! End-to-end tests: market page → card extraction → merge → persisted store

use std::time::Duration;

use player_scraper::{
    parse_cards, EnrichmentMode, HistoryEnricher, MarketExtractor, PlayerId, PlayerRecord,
    PointsHistoryEntry, TargetFilter,
};
use serde_json::json;

use crate::{PlayerRegistry, RecordStore, RegistryError};

const MARKET_PAGE: &str = r#"
    <div class="lista_elementos">
      <div class="elemento_jugador"
           onclick="app.Analytics.showPlayerDetail('laliga-fantasy','',8405);"
           data-nombre="Pau CubarsíCubarsí" data-equipo="3" data-posicion="DEF"
           data-valor="12.000.000"
           data-valor7="11.000.000" data-diferencia7="1.000.000" data-diferencia-pct7="9,09"
           data-puntos-jornadas="J1: 6 | J2: 4 | J3: 10">
        <div class="datos-nombre">Pau CubarsíPau Cubarsí</div>
        <div class="equipo"><span>Barcelona</span></div>
      </div>
      <div class="elemento_jugador"
           onclick="app.Analytics.showPlayerDetail('laliga-fantasy','',17);"
           data-valor="3.000.000">
        <div class="datos-nombre">Paulo GazzanigaGazzaniga</div>
        <div class="equipo"><span>Girona</span></div>
      </div>
    </div>"#;

async fn extract(mode: EnrichmentMode, filter: Option<TargetFilter>) -> Vec<PlayerRecord> {
    let cards = parse_cards(MARKET_PAGE).unwrap();
    let enricher = HistoryEnricher::attributes_only();
    let mut extractor = MarketExtractor::new(&enricher, mode);
    extractor.extract(&cards, filter).await
}

#[tokio::test]
async fn test_full_run_replaces_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.json");

    let mut registry = PlayerRegistry::load(&path).await;
    assert!(registry.is_empty());

    registry.replace(extract(EnrichmentMode::Market, None).await, EnrichmentMode::Market);
    registry.save(&path).await.unwrap();

    let reloaded = PlayerRegistry::load(&path).await;
    assert_eq!(reloaded.player_count(), 2);
    assert_eq!(reloaded.store().count, 2);

    let pau = reloaded.get_by_id(&PlayerId::Numeric(8405)).unwrap();
    assert_eq!(pau.name, "Pau Cubarsí");
    assert_eq!(pau.points_total, Some(20.0));
    assert_eq!(pau.windows.get(7).map(|w| w.diff_pct), Some(9.09));
    assert_eq!(
        pau.points_history.as_deref(),
        Some(
            &[
                PointsHistoryEntry { matchday: 1, points: 6.0 },
                PointsHistoryEntry { matchday: 2, points: 4.0 },
                PointsHistoryEntry { matchday: 3, points: 10.0 },
            ][..]
        )
    );

    let paulo = reloaded.get_by_name("Paulo Gazzaniga").unwrap();
    assert_eq!(paulo.team.as_deref(), Some("Girona"));
    assert_eq!(paulo.points_history, None);
}

#[tokio::test]
async fn test_filtered_run_merges_into_existing_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.json");

    let existing = json!({
        "updated_at": "2025-09-01T08:00:00+00:00",
        "count": 2,
        "mode": "market",
        "source": "manual import",
        "players": [
            {"id": "8405", "name": "Pau Cubarsí", "value": 9000000,
             "points_history": [{"matchday": 1, "points": 6.0}]},
            {"id": 5, "name": "Lamine Yamal", "value": 150000000}
        ]
    });
    std::fs::write(&path, serde_json::to_string_pretty(&existing).unwrap()).unwrap();

    let mut registry = PlayerRegistry::load(&path).await;
    assert_eq!(registry.player_count(), 2);

    let filter = TargetFilter::new([8405], Vec::<String>::new());
    let updates = extract(EnrichmentMode::Market, Some(filter)).await;
    assert_eq!(updates.len(), 1);

    let applied = registry.merge_updates(updates.clone(), EnrichmentMode::Market);
    assert_eq!(applied, 1);
    registry.save(&path).await.unwrap();

    let reloaded = PlayerRegistry::load(&path).await;
    assert_eq!(reloaded.player_count(), 2);
    assert_eq!(reloaded.store().extra.get("source"), Some(&json!("manual import")));

    let pau = reloaded.get_by_id(&PlayerId::Numeric(8405)).unwrap();
    assert_eq!(pau.value, Some(12_000_000));
    assert_eq!(pau.points_history.as_ref().map(Vec::len), Some(3));

    let lamine = reloaded.get_by_name("lamine yamal").unwrap();
    assert_eq!(lamine.value, Some(150_000_000));

    // Same update again changes nothing
    let mut again = PlayerRegistry::load(&path).await;
    again.merge_updates(updates, EnrichmentMode::Market);
    assert_eq!(again.players(), reloaded.players());
}

#[tokio::test]
async fn test_corrupt_store_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.json");
    std::fs::write(&path, "{ not json").unwrap();

    let registry = PlayerRegistry::load(&path).await;
    assert!(registry.is_empty());
    assert!(registry.load_failed());
    let expected = RecordStore { updated_at: registry.store().updated_at, ..RecordStore::new() };
    assert_eq!(registry.store(), &expected);
}

#[tokio::test]
async fn test_filtered_run_never_overwrites_unparseable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.json");
    let content = r#"{"count": null, "players": [{"name": "Lamine Yamal"}]}"#;
    std::fs::write(&path, content).unwrap();

    let mut registry = PlayerRegistry::load(&path).await;
    assert!(registry.load_failed());

    let filter = TargetFilter::new([8405], Vec::<String>::new());
    let updates = extract(EnrichmentMode::Market, Some(filter)).await;
    registry.merge_updates(updates, EnrichmentMode::Market);
    assert!(matches!(registry.save(&path).await, Err(RegistryError::UnreadableStore(_))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

    // A full run is a complete snapshot and may replace the file
    registry.replace(extract(EnrichmentMode::Market, None).await, EnrichmentMode::Market);
    registry.save(&path).await.unwrap();
    assert_eq!(PlayerRegistry::load(&path).await.player_count(), 2);
}

#[tokio::test]
async fn test_points_mode_records_empty_history() {
    let extraction = extract(EnrichmentMode::Points, None);
    let players = tokio::time::timeout(Duration::from_secs(5), extraction).await.unwrap();
    let paulo = players.iter().find(|p| p.name == "Paulo Gazzaniga").unwrap();
    assert_eq!(paulo.points_history, Some(Vec::new()));
}
