use std::collections::BTreeMap;
use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric::{to_float, to_int};

/// Lookback windows (in days) for which the market publishes value deltas
pub const VALUE_WINDOWS: [u32; 6] = [1, 2, 3, 7, 14, 30];

/// Points scored on a single matchday
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsHistoryEntry {
    /// Matchday number, starting at 1
    pub matchday: u32,
    /// Fantasy points for that matchday
    pub points: f64,
}

/// Player identifier as published by the market.
///
/// Stores written by older tools hold ids as strings, the page exposes them
/// as integers; both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerId {
    Numeric(i64),
    Text(String),
}

impl PlayerId {
    /// Trimmed textual form
    pub fn as_text(&self) -> String {
        match self {
            PlayerId::Numeric(n) => n.to_string(),
            PlayerId::Text(s) => s.trim().to_string(),
        }
    }

    /// Integer form, when the id is numeric
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PlayerId::Numeric(n) => Some(*n),
            PlayerId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for PlayerId {
    fn from(id: i64) -> Self {
        PlayerId::Numeric(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Which enrichment the card path performs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentMode {
    /// Market values only; history comes from card attributes alone
    #[default]
    Market,
    /// Also resolve full points histories through the detail lookup
    Points,
}

impl fmt::Display for EnrichmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentMode::Market => write!(f, "market"),
            EnrichmentMode::Points => write!(f, "points"),
        }
    }
}

/// Market value change over one lookback window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueWindow {
    /// Market value at the start of the window
    pub value: i64,
    /// Absolute change over the window
    pub diff: i64,
    /// Percentage change over the window
    pub diff_pct: f64,
}

/// Value windows keyed by days, stored flat as `value_{k}`, `diff_{k}`,
/// `diff_pct_{k}` in the persisted record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueWindows(pub BTreeMap<u32, ValueWindow>);

impl ValueWindows {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, days: u32) -> Option<&ValueWindow> {
        self.0.get(&days)
    }

    pub fn insert(&mut self, days: u32, window: ValueWindow) {
        self.0.insert(days, window);
    }

    /// Overwrite every window present in `other`
    pub fn extend_from(&mut self, other: &ValueWindows) {
        self.0.extend(other.0.iter().map(|(k, v)| (*k, *v)));
    }
}

impl Serialize for ValueWindows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len() * 3))?;
        for (days, window) in &self.0 {
            map.serialize_entry(&format!("value_{days}"), &window.value)?;
            map.serialize_entry(&format!("diff_{days}"), &window.diff)?;
            map.serialize_entry(&format!("diff_pct_{days}"), &window.diff_pct)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValueWindows {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut windows = ValueWindows::default();

        for (key, value) in raw {
            let (field, days) = if let Some(days) = key.strip_prefix("diff_pct_") {
                ("diff_pct", days)
            } else if let Some(days) = key.strip_prefix("diff_") {
                ("diff", days)
            } else if let Some(days) = key.strip_prefix("value_") {
                ("value", days)
            } else {
                continue;
            };
            let Ok(days) = days.parse::<u32>() else { continue };

            let window = windows.0.entry(days).or_default();
            match field {
                "diff_pct" => window.diff_pct = json_float(&value).unwrap_or(0.0),
                "diff" => window.diff = json_int(&value),
                _ => window.value = json_int(&value),
            }
        }

        Ok(windows)
    }
}

fn json_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => to_int(s),
        _ => 0,
    }
}

fn json_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => to_float(s),
        _ => None,
    }
}

/// A player as extracted from one market card.
///
/// Optional fields left as `None` mean "not observed in this extraction";
/// merging never lets them erase a stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Market player id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    /// Canonical name (see [`crate::name::clean_name`])
    #[serde(default)]
    pub name: String,
    /// Team identifier from the card attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Visible team name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Position code (POR, DEF, MED, DEL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Current market value in euros
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_last5: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_total: Option<f64>,
    /// Per-matchday points, ascending and unique by matchday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_history: Option<Vec<PointsHistoryEntry>>,
    #[serde(flatten)]
    pub windows: ValueWindows,
}

impl PlayerRecord {
    /// Create a record holding only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Short label for log lines
    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("{} (ID {id})", self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_id_forms() {
        assert_eq!(PlayerId::Text(" 8405 ".to_string()).as_int(), Some(8405));
        assert_eq!(PlayerId::Text(" 8405 ".to_string()).as_text(), "8405");
        assert_eq!(PlayerId::Numeric(8405).as_text(), "8405");
        assert_eq!(PlayerId::Text("abc".to_string()).as_int(), None);
    }

    #[test]
    fn test_record_json_shape() {
        let mut record = PlayerRecord::named("Pau Cubarsí");
        record.id = Some(PlayerId::Numeric(8405));
        record.value = Some(12_000_000);
        record.windows.insert(1, ValueWindow { value: 11_900_000, diff: 100_000, diff_pct: 0.84 });
        record.points_history = Some(vec![PointsHistoryEntry { matchday: 1, points: 6.0 }]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], json!(8405));
        assert_eq!(json["value_1"], json!(11_900_000));
        assert_eq!(json["diff_1"], json!(100_000));
        assert_eq!(json["diff_pct_1"], json!(0.84));
        assert_eq!(json["points_history"], json!([{"matchday": 1, "points": 6.0}]));
        assert!(json.get("team").is_none());

        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_accepts_string_ids_and_loose_windows() {
        let record: PlayerRecord = serde_json::from_value(json!({
            "id": "8405",
            "name": "Pau Cubarsí",
            "value_7": "1.200.000",
            "diff_pct_7": "3,5",
            "extra_field": true
        }))
        .unwrap();
        assert_eq!(record.id, Some(PlayerId::Text("8405".to_string())));
        let window = record.windows.get(7).unwrap();
        assert_eq!(window.value, 1_200_000);
        assert_eq!(window.diff, 0);
        assert_eq!(window.diff_pct, 3.5);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_value(EnrichmentMode::Points).unwrap(), json!("points"));
        assert_eq!(EnrichmentMode::default(), EnrichmentMode::Market);
        assert_eq!(EnrichmentMode::Market.to_string(), "market");
    }
}
