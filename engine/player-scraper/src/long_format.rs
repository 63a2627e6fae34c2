//! Wide → long reshaping of the normalized players table.

use tracing::{debug, info};

use crate::columns::{self, Cell, ColumnRole, NormalizedTable};
use crate::error::{ExtractError, Result};

/// One (player, matchday) observation
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub player: Option<String>,
    pub team: Option<String>,
    pub position: Option<String>,
    pub value: Option<f64>,
    pub variation: Option<f64>,
    pub matchday: u32,
    pub points: f64,
}

/// Identifying cells carried into every long row
struct IdentityColumns {
    player: Option<usize>,
    team: Option<usize>,
    position: Option<usize>,
    value: Option<usize>,
    variation: Option<usize>,
}

impl IdentityColumns {
    fn of(table: &NormalizedTable) -> Self {
        Self {
            player: table.column_index(columns::PLAYER),
            team: table.column_index(columns::TEAM),
            position: table.column_index(columns::POSITION),
            value: table.column_index(columns::VALUE),
            variation: table.column_index(columns::VARIATION),
        }
    }

    fn row(&self, cells: &[Cell], matchday: u32, points: f64) -> LongRow {
        let text = |idx: Option<usize>| idx.and_then(|i| cells[i].as_text());
        let number = |idx: Option<usize>| idx.and_then(|i| cells[i].as_number());
        LongRow {
            player: text(self.player),
            team: text(self.team),
            position: text(self.position),
            value: number(self.value),
            variation: number(self.variation),
            matchday,
            points,
        }
    }
}

/// Reshape the table into one row per player and matchday.
///
/// Wide `J<n>` columns are melted in ascending matchday order; without them
/// a `Jornada`/`Puntos` column pair is used as is. Rows whose matchday or
/// points do not parse are dropped.
pub fn to_long_format(table: &NormalizedTable) -> Result<Vec<LongRow>> {
    let identity = IdentityColumns::of(table);

    let mut wide: Vec<(u32, usize)> = table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(idx, label)| match ColumnRole::of_canonical(label) {
            ColumnRole::Matchday(n) => Some((n, idx)),
            _ => None,
        })
        .collect();

    let rows = if !wide.is_empty() {
        wide.sort_by_key(|(n, _)| *n);
        debug!("Melting {} matchday columns", wide.len());

        let mut rows = Vec::with_capacity(wide.len() * table.rows.len());
        for (matchday, idx) in &wide {
            for cells in &table.rows {
                if let Some(points) = points_of(&cells[*idx]) {
                    rows.push(identity.row(cells, *matchday, points));
                }
            }
        }
        rows
    } else {
        let matchday_col =
            find_column(table, columns::MATCHDAY).ok_or(ExtractError::NoMatchdayColumns)?;
        let points_col =
            find_column(table, columns::POINTS).ok_or(ExtractError::NoMatchdayColumns)?;
        debug!(
            "Using long columns '{}' and '{}'",
            table.columns[matchday_col], table.columns[points_col]
        );

        table
            .rows
            .iter()
            .filter_map(|cells| {
                let matchday = matchday_of(&cells[matchday_col])?;
                let points = points_of(&cells[points_col])?;
                Some(identity.row(cells, matchday, points))
            })
            .collect()
    };

    info!("Long format: {} rows", rows.len());
    Ok(rows)
}

/// First column named `canonical`, or suffixed from it, or normalizing to it
fn find_column(table: &NormalizedTable, canonical: &str) -> Option<usize> {
    table
        .columns
        .iter()
        .position(|c| c.starts_with(canonical) || columns::normalize_column_name(c) == canonical)
}

fn points_of(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(text) => {
            text.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
        }
        Cell::Missing => None,
    }
}

/// Numeric matchday cell truncated to an integer; must be at least 1
fn matchday_of(cell: &Cell) -> Option<u32> {
    let value = points_of(cell)?.trunc();
    if value >= 1.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}
