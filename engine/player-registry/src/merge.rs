//! Identity-keyed merging of freshly extracted records into a stored list.

use tracing::debug;

use player_scraper::PlayerRecord;

use crate::index::IdentityIndex;

/// Result of [`merge_players`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub players: Vec<PlayerRecord>,
    /// Number of updates applied, merged or appended
    pub updated: usize,
}

/// Merge `updates` into `base`.
///
/// Each update lands on the record with the same id, else the same
/// canonical name, and is appended when neither matches. The index follows
/// every write, so two updates for one player in the same batch end up in
/// a single record.
pub fn merge_players(
    base: Vec<PlayerRecord>,
    updates: impl IntoIterator<Item = PlayerRecord>,
) -> MergeOutcome {
    let mut players = base;
    let mut index = IdentityIndex::build(&players);
    let mut updated = 0;

    for update in updates {
        let position = match index.resolve(&update) {
            Some(position) => {
                debug!("Merging {} into record {}", update.describe(), position);
                apply_update(&mut players[position], update);
                position
            }
            None => {
                debug!("Appending {}", update.describe());
                players.push(update);
                players.len() - 1
            }
        };
        index.insert(&players[position], position);
        updated += 1;
    }

    MergeOutcome { players, updated }
}

/// Overwrite every field the update carries; absent fields keep their value.
pub fn apply_update(target: &mut PlayerRecord, update: PlayerRecord) {
    let PlayerRecord {
        id,
        name,
        team_id,
        team,
        position,
        value,
        points_avg,
        points_last5,
        points_total,
        points_history,
        windows,
    } = update;

    if id.is_some() {
        target.id = id;
    }
    if !name.is_empty() {
        target.name = name;
    }
    overwrite(&mut target.team_id, team_id);
    overwrite(&mut target.team, team);
    overwrite(&mut target.position, position);
    overwrite(&mut target.value, value);
    overwrite(&mut target.points_avg, points_avg);
    overwrite(&mut target.points_last5, points_last5);
    overwrite(&mut target.points_total, points_total);
    overwrite(&mut target.points_history, points_history);
    target.windows.extend_from(&windows);
}

fn overwrite<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}
