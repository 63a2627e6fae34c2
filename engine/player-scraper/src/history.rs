//! Points-history interpretation.
//!
//! History arrives in many shapes: `data-*` attributes holding JSON or
//! `"J1: 6 | J2: 4"` strings, dataset maps with `j1`/`j2` keys, detail-API
//! documents with nested `history`/`points` arrays, or bare number lists.
//! Every shape is lifted into a [`Payload`] and walked by one recursive
//! function that collects `(matchday, points)` pairs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::name::normalize_whitespace;
use crate::numeric::to_float;
use crate::types::PointsHistoryEntry;

const MATCHDAY_KEYS: [&str; 5] = ["matchday", "jornada", "round", "day", "gw"];
const POINTS_KEYS: [&str; 5] = ["points", "puntos", "score", "valor", "value"];
const NESTED_KEYS: [&str; 8] =
    ["historial", "history", "puntuaciones", "scores", "matchdays", "jornadas", "points", "values"];

static MATCHDAY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:j|jor|jornada|gw|md)[_\-]?([0-9]{1,3})").unwrap());

static PAIR_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:j(?:or(?:nada)?)?|gw|md|round)?\s*([0-9]{1,3})[^0-9+\-]*([-+]?\d+(?:[.,]\d+)?)",
    )
    .unwrap()
});

static PAIR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:j(?:or(?:nada)?)?|gw|md|round)?\s*([0-9]{1,3})\s*[:\-]?\s*([-+]?\d+(?:[.,]\d+)?)",
    )
    .unwrap()
});

static FIRST_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{1,3}").unwrap());

/// Loosely structured history payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    Number(f64),
    Text(String),
    /// Keys in source order; order decides which duplicate matchday wins.
    Mapping(Vec<(String, Payload)>),
    Sequence(Vec<Payload>),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(_) => Payload::Absent,
            Value::Number(n) => n.as_f64().map(Payload::Number).unwrap_or(Payload::Absent),
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => {
                Payload::Sequence(items.into_iter().map(Payload::from).collect())
            }
            Value::Object(map) => {
                Payload::Mapping(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl<K: Into<String>> FromIterator<(K, String)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, String)>>(iter: I) -> Self {
        Payload::Mapping(iter.into_iter().map(|(k, v)| (k.into(), Payload::Text(v))).collect())
    }
}

/// Parse any payload into a deduplicated, ascending series.
pub fn parse_points_history(payload: &Payload) -> Vec<PointsHistoryEntry> {
    let mut collected = Vec::new();
    walk(payload, &mut collected);
    dedupe_points_history(collected)
}

/// Keep one entry per matchday (the last one seen) sorted by matchday.
pub fn dedupe_points_history(
    entries: impl IntoIterator<Item = PointsHistoryEntry>,
) -> Vec<PointsHistoryEntry> {
    let by_matchday: BTreeMap<u32, f64> =
        entries.into_iter().map(|entry| (entry.matchday, entry.points)).collect();
    by_matchday
        .into_iter()
        .map(|(matchday, points)| PointsHistoryEntry { matchday, points })
        .collect()
}

fn walk(payload: &Payload, out: &mut Vec<PointsHistoryEntry>) {
    match payload {
        Payload::Absent => {}
        Payload::Number(points) => {
            let matchday = out.len() as u32 + 1;
            push_entry(out, Some(matchday), Some(*points));
        }
        Payload::Mapping(entries) => walk_mapping(entries, out),
        Payload::Sequence(items) => items.iter().for_each(|item| walk(item, out)),
        Payload::Text(text) => walk_text(text, out),
    }
}

fn walk_mapping(entries: &[(String, Payload)], out: &mut Vec<PointsHistoryEntry>) {
    let mut lowered: Vec<(String, &Payload)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let key = key.to_lowercase();
        match lowered.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => lowered.push((key, value)),
        }
    }
    for (key, value) in &lowered {
        if let Some(caps) = MATCHDAY_KEY.captures(key) {
            let matchday = caps[1].parse::<u32>().ok().filter(|md| *md > 0);
            push_entry(out, matchday, points_of(value));
        }
    }

    // An explicit pair is applied after the per-key entries so it wins on
    // a shared matchday. A scalar points value used by the pair is not
    // re-read as a nested history; a container under that key still is.
    let mut consumed: Option<&str> = None;
    if let (Some((_, matchday)), Some((points_key, points))) =
        (lookup_keyed(&lowered, &MATCHDAY_KEYS), lookup_keyed(&lowered, &POINTS_KEYS))
    {
        if let Some(value) = points_of(points) {
            push_entry(out, matchday_of(matchday), Some(value));
            consumed = Some(points_key);
        }
    }

    for name in NESTED_KEYS {
        if consumed == Some(name) {
            continue;
        }
        if let Some((_, nested)) = lowered.iter().find(|(k, _)| k == name) {
            walk(nested, out);
        }
    }
}

fn lookup_keyed<'a>(
    lowered: &[(String, &'a Payload)],
    names: &[&'static str],
) -> Option<(&'static str, &'a Payload)> {
    names.iter().find_map(|name| {
        lowered.iter().find(|(k, _)| k == name).map(|(_, v)| (*name, *v))
    })
}

fn walk_text(text: &str, out: &mut Vec<PointsHistoryEntry>) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    for candidate in [text.to_string(), text.replace('\'', "\"")] {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            walk(&Payload::from(value), out);
            return;
        }
    }

    let mut matched = false;
    for caps in PAIR_SEQUENCE.captures_iter(text) {
        matched = true;
        push_entry(out, caps[1].parse().ok(), to_float(&caps[2]));
    }
    if matched {
        return;
    }

    for token in text.split(['|', ';', ',']).map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(caps) = PAIR_TOKEN.captures(token) {
            push_entry(out, caps[1].parse().ok(), to_float(&caps[2]));
        }
    }
}

fn push_entry(out: &mut Vec<PointsHistoryEntry>, matchday: Option<u32>, points: Option<f64>) {
    if let (Some(matchday), Some(points)) = (matchday, points) {
        if matchday > 0 {
            out.push(PointsHistoryEntry { matchday, points });
        }
    }
}

/// Matchday from a number or from the first 1-3 digit run of a text.
pub fn matchday_of(payload: &Payload) -> Option<u32> {
    match payload {
        Payload::Number(n) if n.is_finite() && *n >= 1.0 => Some(n.trunc() as u32),
        Payload::Text(text) => parse_matchday(text),
        _ => None,
    }
}

/// First 1-3 digit run of a label such as `"Jornada 12"`.
pub fn parse_matchday(text: &str) -> Option<u32> {
    let text = normalize_whitespace(text);
    FIRST_DIGITS.find(&text)?.as_str().parse::<u32>().ok().filter(|md| *md > 0)
}

fn points_of(payload: &Payload) -> Option<f64> {
    match payload {
        Payload::Number(n) => Some(*n),
        Payload::Text(text) => to_float(text),
        _ => None,
    }
}

/// Mean points, over the last `last` matchdays when given.
pub fn average(series: &[PointsHistoryEntry], last: Option<usize>) -> Option<f64> {
    let window = match last {
        Some(n) if n > 0 => &series[series.len().saturating_sub(n)..],
        _ => series,
    };
    if window.is_empty() {
        return None;
    }
    Some(window.iter().map(|e| e.points).sum::<f64>() / window.len() as f64)
}

/// Sum of the series, `None` when empty.
pub fn total(series: &[PointsHistoryEntry]) -> Option<f64> {
    if series.is_empty() {
        None
    } else {
        Some(series.iter().map(|e| e.points).sum())
    }
}
