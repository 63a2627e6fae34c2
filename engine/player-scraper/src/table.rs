//! Candidate tables and selection of the players table.
//!
//! A points page carries several tables (standings, fixtures, ads rendered
//! as tables). Each is scored on its column labels and the best one that has
//! both a player column and at least one points column is kept.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::name::normalize_whitespace;

static PLAYER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"jugador|nombre|player").unwrap());
static TEAM_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"equipo|club").unwrap());
static POSITION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pos|posición|demarcación").unwrap());
static POSITION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:por|def|med|del)$").unwrap());
static POINTS_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"puntos|pts|jornada").unwrap());
static MATCHDAY_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^j\s*-?\s*\d+").unwrap());

/// One `<table>` as found on the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCandidate {
    /// Column labels, in page order
    pub columns: Vec<String>,
    /// Rows padded to `columns.len()`; `None` is an empty cell
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableCandidate {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Convenience constructor from string cells; empty strings become `None`
    pub fn from_text<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Self {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| non_empty(cell.as_ref())).collect())
            .collect();
        Self::new(columns, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse every `<table>` of a page.
pub fn parse_tables(html: &str) -> Result<Vec<TableCandidate>> {
    let document = Html::parse_document(html);
    let table_selector = parse_selector("table")?;
    let row_selector = parse_selector("tr")?;
    let head_row_selector = parse_selector("thead tr")?;

    let mut tables = Vec::new();
    for table in document.select(&table_selector) {
        // Rows of nested tables are skipped; those tables are visited on
        // their own.
        let own_rows: Vec<ElementRef> =
            table.select(&row_selector).filter(|row| owning_table(row) == Some(table)).collect();
        let head_rows: Vec<ElementRef> = table
            .select(&head_row_selector)
            .filter(|row| owning_table(row) == Some(table))
            .collect();

        let header_row = match head_rows.last() {
            Some(row) => Some(*row),
            None => own_rows.first().copied().filter(is_header_row),
        };

        let columns: Vec<String> = match header_row {
            Some(row) => row_cells(row).map(|cell| cell_text(&cell)).collect(),
            None => Vec::new(),
        };

        let rows: Vec<Vec<Option<String>>> = own_rows
            .iter()
            .filter(|row| Some(**row) != header_row && !head_rows.contains(*row))
            .map(|row| row_cells(*row).map(|cell| non_empty(&cell_text(&cell))).collect())
            .filter(|cells: &Vec<Option<String>>| !cells.is_empty())
            .collect();

        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(columns.len());
        let columns = if columns.is_empty() {
            (0..width).map(|i| i.to_string()).collect()
        } else {
            let mut columns = columns;
            let start = columns.len();
            columns.extend((start..width).map(|i| i.to_string()));
            columns
        };

        tables.push(TableCandidate::new(columns, rows));
    }

    info!("Found {} tables in page", tables.len());
    Ok(tables)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::selector(format!("failed to parse '{selector}': {e}")))
}

fn owning_table<'a>(row: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.ancestors().filter_map(ElementRef::wrap).find(|el| el.value().name() == "table")
}

/// `th`/`td` children of a row; cells of nested tables are not included
fn row_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
}

fn is_header_row(row: &ElementRef) -> bool {
    let mut cells = row.children().filter_map(ElementRef::wrap);
    let first = cells.next();
    first.is_some_and(|c| c.value().name() == "th") && cells.all(|c| c.value().name() == "th")
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_whitespace(&cell.text().collect::<String>())
}

/// Label-derived features of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFeatures {
    pub has_player: bool,
    pub has_team: bool,
    pub has_position: bool,
    pub point_columns: usize,
    pub rows: usize,
}

impl TableFeatures {
    pub fn of(table: &TableCandidate) -> Self {
        let lowered: Vec<String> = table.columns.iter().map(|c| c.trim().to_lowercase()).collect();

        Self {
            has_player: lowered.iter().any(|c| PLAYER_LABEL.is_match(c)),
            has_team: lowered.iter().any(|c| TEAM_LABEL.is_match(c)),
            has_position: lowered
                .iter()
                .any(|c| POSITION_LABEL.is_match(c) || POSITION_CODE.is_match(c)),
            point_columns: lowered
                .iter()
                .filter(|c| POINTS_LABEL.is_match(c) || MATCHDAY_LABEL.is_match(c))
                .count(),
            rows: table.row_count(),
        }
    }

    /// A table must name its players and carry at least one points column
    pub fn qualifies(&self) -> bool {
        self.has_player && self.point_columns > 0
    }

    pub fn score(&self) -> TableScore {
        let coverage = usize::from(self.has_player)
            + usize::from(self.has_team)
            + usize::from(self.has_position)
            + if self.point_columns > 0 { 2 } else { 0 };
        TableScore { coverage, point_columns: self.point_columns, rows: self.rows }
    }
}

/// Lexicographic score: schema coverage, then points columns, then rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TableScore {
    pub coverage: usize,
    pub point_columns: usize,
    pub rows: usize,
}

/// Pick the players table; the first of equally scored tables wins.
pub fn select_players_table(tables: &[TableCandidate]) -> Result<&TableCandidate> {
    let mut best: Option<(&TableCandidate, TableScore)> = None;

    for (idx, table) in tables.iter().enumerate() {
        let features = TableFeatures::of(table);
        let score = features.score();
        debug!("Table {}: columns={:?}, score={:?}", idx, table.columns, score);

        if !features.qualifies() {
            continue;
        }
        let better = match &best {
            Some((_, best_score)) => score.cmp(best_score) == Ordering::Greater,
            None => true,
        };
        if better {
            best = Some((table, score));
        }
    }

    match best {
        Some((table, score)) => {
            info!("Selected table with score {:?} ({} rows)", score, table.row_count());
            Ok(table)
        }
        None => {
            warn!("No table satisfies the player/points column heuristic");
            Err(ExtractError::NoTableFound { candidates: tables.len() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: usize) -> TableCandidate {
        let rows = (0..rows)
            .map(|i| columns.iter().map(|_| Some(i.to_string())).collect())
            .collect();
        TableCandidate::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_selects_table_with_matchday_columns() {
        let tables = vec![table(&["Jugador"], 20), table(&["Jugador", "J1", "J2", "J3"], 5)];
        let picked = select_players_table(&tables).unwrap();
        assert_eq!(picked.columns, vec!["Jugador", "J1", "J2", "J3"]);
    }

    #[test]
    fn test_tie_keeps_first_encountered() {
        let first = table(&["Jugador", "J1"], 3);
        let mut second = table(&["Nombre", "J 1"], 3);
        second.rows[0][0] = Some("marker".to_string());
        let tables = vec![first.clone(), second];
        assert_eq!(select_players_table(&tables).unwrap(), &first);
    }

    #[test]
    fn test_coverage_beats_row_count() {
        let tables = vec![
            table(&["Jugador", "Puntos"], 50),
            table(&["Jugador", "Equipo", "Pos", "Puntos"], 10),
        ];
        assert_eq!(select_players_table(&tables).unwrap().columns.len(), 4);
    }

    #[test]
    fn test_no_table_found() {
        let tables = vec![table(&["Equipo", "Puntos"], 10), table(&["Jugador", "Valor"], 10)];
        assert!(matches!(
            select_players_table(&tables),
            Err(ExtractError::NoTableFound { candidates: 2 })
        ));
    }

    #[test]
    fn test_features() {
        let candidate = table(&["Jugador", "Club", "DEF", "J-1", "J2", "Pts"], 4);
        let features = TableFeatures::of(&candidate);
        assert!(features.has_player && features.has_team && features.has_position);
        assert_eq!(features.point_columns, 3);
        assert_eq!(features.score(), TableScore { coverage: 5, point_columns: 3, rows: 4 });
    }

    #[test]
    fn test_parse_tables_with_thead() {
        let html = r#"
            <html><body>
            <table>
              <thead><tr><th>Jugador</th><th>J1</th><th>J2</th></tr></thead>
              <tbody>
                <tr><td>Ana <b>García</b></td><td>5</td><td>7</td></tr>
                <tr><td>Luis</td><td></td><td>3</td></tr>
              </tbody>
            </table>
            </body></html>"#;
        let tables = parse_tables(html).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["Jugador", "J1", "J2"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[0][0].as_deref(), Some("Ana García"));
        assert_eq!(tables[0].rows[1][1], None);
    }

    #[test]
    fn test_nested_table_cells_stay_with_their_table() {
        let html = r#"
            <table>
              <tr><th>Jugador</th><th>Puntos</th></tr>
              <tr>
                <td>Ana</td>
                <td><table><tr><td>J1</td><td>4</td></tr></table></td>
              </tr>
            </table>"#;
        let tables = parse_tables(html).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns, vec!["Jugador", "Puntos"]);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].rows[0].len(), 2);
        assert_eq!(tables[0].rows[0][0].as_deref(), Some("Ana"));
        assert_eq!(tables[1].rows, vec![vec![Some("J1".to_string()), Some("4".to_string())]]);
    }

    #[test]
    fn test_parse_tables_header_row_and_positional_labels() {
        let html = r#"
            <table>
              <tr><th>Nombre</th><th>Puntos</th></tr>
              <tr><td>Ana</td><td>4</td></tr>
            </table>
            <table>
              <tr><td>a</td><td>b</td><td>c</td></tr>
            </table>"#;
        let tables = parse_tables(html).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns, vec!["Nombre", "Puntos"]);
        assert_eq!(tables[0].rows, vec![vec![Some("Ana".to_string()), Some("4".to_string())]]);
        assert_eq!(tables[1].columns, vec!["0", "1", "2"]);
        assert_eq!(tables[1].rows.len(), 1);
    }
}
