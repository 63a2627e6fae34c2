use chrono::{DateTime, Utc};
use player_scraper::{EnrichmentMode, PlayerRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The persisted player collection (`market.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    /// Time of the last write
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Number of players, refreshed on every write
    #[serde(default)]
    pub count: usize,

    /// Mode of the run that last wrote the store
    #[serde(default)]
    pub mode: EnrichmentMode,

    #[serde(default)]
    pub players: Vec<PlayerRecord>,

    /// Top-level keys written by other tools, kept as they are
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            updated_at: Utc::now(),
            count: 0,
            mode: EnrichmentMode::default(),
            players: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Refresh metadata after the player list changed
    pub fn touch(&mut self, mode: EnrichmentMode) {
        self.updated_at = Utc::now();
        self.count = self.players.len();
        self.mode = mode;
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_json_shape() {
        let store: RecordStore = serde_json::from_value(json!({
            "updated_at": "2025-09-14T10:30:00.123456+00:00",
            "count": 1,
            "mode": "points",
            "players": [{"id": 8405, "name": "Pau Cubarsí", "value": 12000000}],
            "source": "futbolfantasy"
        }))
        .unwrap();

        assert_eq!(store.count, 1);
        assert_eq!(store.mode, EnrichmentMode::Points);
        assert_eq!(store.players[0].name, "Pau Cubarsí");
        assert_eq!(store.extra.get("source"), Some(&json!("futbolfantasy")));

        let written = serde_json::to_value(&store).unwrap();
        assert_eq!(written["source"], json!("futbolfantasy"));
        assert_eq!(written["mode"], json!("points"));
    }

    #[test]
    fn test_touch_refreshes_metadata() {
        let mut store = RecordStore::new();
        store.players.push(PlayerRecord::named("Lala"));
        store.touch(EnrichmentMode::Points);
        assert_eq!(store.count, 1);
        assert_eq!(store.mode, EnrichmentMode::Points);
    }
}
