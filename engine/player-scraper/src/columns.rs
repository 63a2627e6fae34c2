//! Column-label canonicalization and cell cleanup for the players table.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::name::normalize_whitespace;
use crate::numeric::clean_cell_number;
use crate::table::TableCandidate;

pub const PLAYER: &str = "Jugador";
pub const TEAM: &str = "Equipo";
pub const POSITION: &str = "Posición";
pub const VALUE: &str = "Valor (€)";
pub const VARIATION: &str = "Variación (%)";
pub const MATCHDAY: &str = "Jornada";
pub const POINTS: &str = "Puntos";

/// Position codes used by the market
pub const POSITION_CODES: [&str; 4] = ["POR", "DEF", "MED", "DEL"];

static MATCHDAY_COLUMN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^j\s*-?\s*(\d+)").unwrap());
static WIDE_COLUMN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^J(\d+)$").unwrap());
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()]+)\)").unwrap());
static SEGMENT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[·\-]\s*").unwrap());

/// Label rules, evaluated in order after the matchday rule
static ROLE_RULES: LazyLock<Vec<(Regex, ColumnRole)>> = LazyLock::new(|| {
    [
        (r"jugador|nombre|player", ColumnRole::Player),
        (r"equipo|club", ColumnRole::Team),
        (r"posici[óo]n|pos\.?:|pos$|demarcaci[óo]n|dem", ColumnRole::Position),
        (r"valor|precio", ColumnRole::Value),
        (r"variaci[óo]n|subida|baja|cambio|%", ColumnRole::VariationPct),
        (r"jornada|matchday|gw|round", ColumnRole::Round),
        (r"puntos|pts|score", ColumnRole::Points),
    ]
    .into_iter()
    .map(|(pattern, role)| (Regex::new(pattern).unwrap(), role))
    .collect()
});

/// Canonical meaning of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Player,
    Team,
    Position,
    Value,
    VariationPct,
    /// Wide per-matchday points column `J<n>`
    Matchday(u32),
    /// Long-format matchday number column
    Round,
    /// Long-format points column
    Points,
    Generic,
}

impl ColumnRole {
    /// Classify a raw column label
    pub fn of_label(label: &str) -> Self {
        let lower = normalize_whitespace(&label.to_lowercase());

        if let Some(n) = MATCHDAY_COLUMN.captures(&lower).and_then(|c| c[1].parse::<u32>().ok()) {
            return ColumnRole::Matchday(n);
        }

        ROLE_RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(&lower))
            .map(|(_, role)| *role)
            .unwrap_or(ColumnRole::Generic)
    }

    /// Role of an already canonical label, `J<n>` included
    pub fn of_canonical(label: &str) -> Self {
        if let Some(n) = WIDE_COLUMN.captures(label).and_then(|c| c[1].parse::<u32>().ok()) {
            return ColumnRole::Matchday(n);
        }
        match label {
            PLAYER => ColumnRole::Player,
            TEAM => ColumnRole::Team,
            POSITION => ColumnRole::Position,
            VALUE => ColumnRole::Value,
            VARIATION => ColumnRole::VariationPct,
            MATCHDAY => ColumnRole::Round,
            POINTS => ColumnRole::Points,
            _ => ColumnRole::Generic,
        }
    }

    /// Canonical label; generic columns keep their trimmed raw label
    pub fn canonical_label(&self, raw: &str) -> String {
        match self {
            ColumnRole::Player => PLAYER.to_string(),
            ColumnRole::Team => TEAM.to_string(),
            ColumnRole::Position => POSITION.to_string(),
            ColumnRole::Value => VALUE.to_string(),
            ColumnRole::VariationPct => VARIATION.to_string(),
            ColumnRole::Matchday(n) => format!("J{n}"),
            ColumnRole::Round => MATCHDAY.to_string(),
            ColumnRole::Points => POINTS.to_string(),
            ColumnRole::Generic => raw.trim().to_string(),
        }
    }
}

/// Canonical label for a raw column label
pub fn normalize_column_name(label: &str) -> String {
    ColumnRole::of_label(label).canonical_label(label)
}

/// Suffix repeated labels: `Puntos, Puntos` → `Puntos, Puntos_1`.
pub fn ensure_unique_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    columns
        .into_iter()
        .map(|col| match seen.get_mut(&col) {
            Some(count) => {
                *count += 1;
                format!("{col}_{count}")
            }
            None => {
                seen.insert(col.clone(), 0);
                col
            }
        })
        .collect()
}

/// Team and position embedded in a player cell.
///
/// Handles `"Ana (Betis)"`, `"Ana - DEF - Betis"` and `"Ana · Betis"`.
pub fn extract_team_and_position(text: &str) -> (Option<String>, Option<String>) {
    let mut team = PARENTHESIZED
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|candidate| !candidate.is_empty());
    let mut position = None;

    let parts: Vec<&str> = SEGMENT_SEPARATOR.split(text).collect();
    if parts.len() >= 2 {
        let possible_team = parts[parts.len() - 1].trim();
        if team.is_none() && possible_team.chars().count() > 1 {
            team = Some(possible_team.to_string());
        }
        let possible_position = parts[parts.len() - 2].trim().to_uppercase();
        if POSITION_CODES.contains(&possible_position.as_str()) {
            position = Some(possible_position);
        }
    }

    (team, position)
}

/// Cleaned table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The players table under canonical labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl NormalizedTable {
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Column cells, or `None` if the label is absent
    pub fn column(&self, label: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(label)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    fn push_column(&mut self, label: &str, cells: Vec<Cell>) {
        self.columns.push(label.to_string());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }

    /// Fill missing cells of `label` from `cells`, adding the column if absent
    fn backfill_column(&mut self, label: &str, cells: Vec<Option<String>>) {
        match self.column_index(label) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    if row[idx].is_missing() {
                        row[idx] = Cell::from(cell);
                    }
                }
            }
            None => self.push_column(label, cells.into_iter().map(Cell::from).collect()),
        }
    }

    fn map_column(&mut self, label: &str, f: impl Fn(&Cell) -> Cell) {
        if let Some(idx) = self.column_index(label) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
    }
}

/// Rename columns to the canonical schema and clean their cells.
pub fn normalize_columns(table: &TableCandidate) -> NormalizedTable {
    let columns =
        ensure_unique_columns(table.columns.iter().map(|c| normalize_column_name(c)).collect());
    debug!("Normalized columns: {:?} -> {:?}", table.columns, columns);

    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().cloned().map(Cell::from).collect())
        .collect();
    let mut normalized = NormalizedTable { columns, rows };

    if let Some(players) = normalized.column(PLAYER) {
        let (teams, positions): (Vec<_>, Vec<_>) = players
            .into_iter()
            .map(|cell| match cell {
                Cell::Text(text) => extract_team_and_position(text),
                _ => (None, None),
            })
            .unzip();
        normalized.backfill_column(TEAM, teams);
        normalized.backfill_column(POSITION, positions);
    }

    for required in [TEAM, POSITION] {
        if normalized.column_index(required).is_none() {
            let cells = vec![Cell::Missing; normalized.rows.len()];
            normalized.push_column(required, cells);
        }
    }

    normalized.map_column(VALUE, |cell| numeric_cell(cell, false));
    normalized.map_column(VARIATION, |cell| numeric_cell(cell, true));

    normalized
}

fn numeric_cell(cell: &Cell, strip_percent: bool) -> Cell {
    match cell {
        Cell::Text(text) => {
            clean_cell_number(text, strip_percent).map(Cell::Number).unwrap_or(Cell::Missing)
        }
        other => other.clone(),
    }
}
