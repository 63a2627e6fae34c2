//! Per-player aggregation of long rows and the CSV exports built from it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::long_format::LongRow;

/// Points of one player on one matchday, duplicates summed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    #[serde(rename = "Jugador")]
    pub player: String,
    #[serde(rename = "Equipo")]
    pub team: Option<String>,
    #[serde(rename = "Posición")]
    pub position: Option<String>,
    #[serde(rename = "Jornada")]
    pub matchday: u32,
    #[serde(rename = "Puntos")]
    pub points: f64,
}

/// Group long rows by (player, matchday), summing points.
///
/// Each player carries the first team and position seen for them. Rows
/// without a player are skipped. Output is ordered by player, then matchday.
pub fn aggregate(rows: &[LongRow]) -> Vec<AggregatedRow> {
    let mut sums: BTreeMap<(String, u32), f64> = BTreeMap::new();
    let mut teams: HashMap<String, String> = HashMap::new();
    let mut positions: HashMap<String, String> = HashMap::new();

    for row in rows {
        let Some(player) = &row.player else { continue };
        *sums.entry((player.clone(), row.matchday)).or_insert(0.0) += row.points;
        if let Some(team) = &row.team {
            teams.entry(player.clone()).or_insert_with(|| team.clone());
        }
        if let Some(position) = &row.position {
            positions.entry(player.clone()).or_insert_with(|| position.clone());
        }
    }

    sums.into_iter()
        .map(|((player, matchday), points)| AggregatedRow {
            team: teams.get(&player).cloned(),
            position: positions.get(&player).cloned(),
            player,
            matchday,
            points,
        })
        .collect()
}

/// Players × matchdays points matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    /// Matchdays, ascending
    pub matchdays: Vec<u32>,
    /// Players, sorted, with one cell per matchday
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl Pivot {
    pub fn from_rows(rows: &[AggregatedRow]) -> Self {
        let matchdays: Vec<u32> =
            rows.iter().map(|r| r.matchday).collect::<BTreeSet<_>>().into_iter().collect();
        let column: HashMap<u32, usize> =
            matchdays.iter().enumerate().map(|(i, md)| (*md, i)).collect();

        let mut by_player: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
        for row in rows {
            let cells = by_player
                .entry(row.player.as_str())
                .or_insert_with(|| vec![None; matchdays.len()]);
            let cell = &mut cells[column[&row.matchday]];
            *cell = Some(cell.unwrap_or(0.0) + row.points);
        }

        Self {
            matchdays,
            rows: by_player
                .into_iter()
                .map(|(player, cells)| (player.to_string(), cells))
                .collect(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.rows.len()
    }
}

/// Write the long export (`Jugador, Equipo, Posición, Jornada, Puntos`)
pub fn write_long<W: Write>(writer: W, rows: &[AggregatedRow]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the pivot export, one column per matchday
pub fn write_pivot<W: Write>(writer: W, pivot: &Pivot) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["Jugador".to_string()];
    header.extend(pivot.matchdays.iter().map(u32::to_string));
    csv.write_record(&header)?;

    for (player, cells) in &pivot.rows {
        let mut record = vec![player.clone()];
        record.extend(cells.iter().map(|cell| cell.map(|p| p.to_string()).unwrap_or_default()));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_long_csv(path: impl AsRef<Path>, rows: &[AggregatedRow]) -> Result<()> {
    let path = path.as_ref();
    write_long(File::create(path)?, rows)?;
    info!("Wrote {} ({} rows)", path.display(), rows.len());
    Ok(())
}

pub fn write_pivot_csv(path: impl AsRef<Path>, pivot: &Pivot) -> Result<()> {
    let path = path.as_ref();
    write_pivot(File::create(path)?, pivot)?;
    info!("Wrote {} (players={})", path.display(), pivot.player_count());
    Ok(())
}
