use crate::error::{RegistryError, Result};
use crate::index::IdentityIndex;
use crate::merge::merge_players;
use crate::types::RecordStore;
use player_scraper::{EnrichmentMode, PlayerId, PlayerRecord};
use std::path::Path;
use tracing::{info, warn};

/// Player Registry - the persisted market store
///
/// Holds the record store in memory together with an identity index over
/// its players, and reads/writes it as pretty JSON.
pub struct PlayerRegistry {
    store: RecordStore,
    index: IdentityIndex,
    /// Set when an existing store file could not be read or parsed; only a
    /// full `replace` may then overwrite it
    load_failed: bool,
}

impl PlayerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::from_store(RecordStore::new())
    }

    pub fn from_store(store: RecordStore) -> Self {
        let index = IdentityIndex::build(&store.players);
        Self { store, index, load_failed: false }
    }

    /// Load the store at `path`.
    ///
    /// A missing file yields an empty registry; an unreadable or corrupt one
    /// is reported and also yields an empty registry, marked so that
    /// [`save`](Self::save) will not overwrite the file with a partial list.
    pub async fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing store at {:?}, starting empty", path);
                return Self::new();
            }
            Err(e) => {
                warn!("Could not read {:?}: {}", path, e);
                return Self::failed_load();
            }
        };

        match serde_json::from_str::<RecordStore>(&content) {
            Ok(store) => {
                info!("Loaded {} players from {:?}", store.players.len(), path);
                Self::from_store(store)
            }
            Err(e) => {
                warn!("Could not parse {:?}: {}", path, e);
                Self::failed_load()
            }
        }
    }

    fn failed_load() -> Self {
        Self { load_failed: true, ..Self::new() }
    }

    /// True when the store file existed but could not be read or parsed
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Write the store as pretty JSON
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.load_failed {
            return Err(RegistryError::UnreadableStore(path.display().to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.store)?;
        tokio::fs::write(path, json).await?;

        info!("Saved {} players to {:?}", self.store.count, path);
        Ok(())
    }

    /// Replace the player list with the result of a full run
    pub fn replace(&mut self, players: Vec<PlayerRecord>, mode: EnrichmentMode) {
        self.store.players = players;
        self.store.touch(mode);
        self.index = IdentityIndex::build(&self.store.players);
        self.load_failed = false;
    }

    /// Merge the result of a filtered run; returns the number of updates applied
    pub fn merge_updates(&mut self, players: Vec<PlayerRecord>, mode: EnrichmentMode) -> usize {
        let base = std::mem::take(&mut self.store.players);
        let outcome = merge_players(base, players);

        self.store.players = outcome.players;
        self.store.touch(mode);
        self.index = IdentityIndex::build(&self.store.players);

        info!("Applied {} updates ({} players stored)", outcome.updated, self.store.count);
        outcome.updated
    }

    /// Get a player by market id
    pub fn get_by_id(&self, id: &PlayerId) -> Result<&PlayerRecord> {
        self.index
            .position_of_id(id)
            .map(|position| &self.store.players[position])
            .ok_or_else(|| RegistryError::PlayerNotFound(id.to_string()))
    }

    /// Get a player by canonical name, ignoring case
    pub fn get_by_name(&self, name: &str) -> Result<&PlayerRecord> {
        self.index
            .position_of_name(name)
            .map(|position| &self.store.players[position])
            .ok_or_else(|| RegistryError::PlayerNotFound(name.to_string()))
    }

    /// Search for players by partial name match
    pub fn search_players(&self, query: &str) -> Vec<&PlayerRecord> {
        let query_lower = query.to_lowercase();
        self.store
            .players
            .iter()
            .filter(|player| player.name.to_lowercase().contains(&query_lower))
            .collect()
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.store.players
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn player_count(&self) -> usize {
        self.store.players.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_players() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord {
                id: Some(PlayerId::Numeric(8405)),
                team: Some("Barcelona".to_string()),
                position: Some("DEF".to_string()),
                value: Some(12_000_000),
                ..PlayerRecord::named("Pau Cubarsí")
            },
            PlayerRecord {
                id: Some(PlayerId::Numeric(17)),
                team: Some("Girona".to_string()),
                position: Some("POR".to_string()),
                value: Some(3_000_000),
                ..PlayerRecord::named("Paulo Gazzaniga")
            },
        ]
    }

    #[test]
    fn test_replace_refreshes_metadata() {
        let mut registry = PlayerRegistry::new();
        registry.replace(create_test_players(), EnrichmentMode::Points);

        assert_eq!(registry.player_count(), 2);
        assert_eq!(registry.store().count, 2);
        assert_eq!(registry.store().mode, EnrichmentMode::Points);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_lookups() {
        let mut registry = PlayerRegistry::new();
        registry.replace(create_test_players(), EnrichmentMode::Market);

        let pau = registry.get_by_id(&PlayerId::Text("8405".to_string())).unwrap();
        assert_eq!(pau.name, "Pau Cubarsí");

        let paulo = registry.get_by_name("paulo gazzaniga").unwrap();
        assert_eq!(paulo.value, Some(3_000_000));

        assert!(matches!(
            registry.get_by_id(&PlayerId::Numeric(1)),
            Err(RegistryError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_search_players() {
        let mut registry = PlayerRegistry::new();
        registry.replace(create_test_players(), EnrichmentMode::Market);

        let results = registry.search_players("pau");
        assert_eq!(results.len(), 2);

        let results = registry.search_players("GAZZ");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Paulo Gazzaniga");
    }

    #[test]
    fn test_merge_updates_counts_and_indexes() {
        let mut registry = PlayerRegistry::new();
        registry.replace(create_test_players(), EnrichmentMode::Market);

        let update =
            PlayerRecord { id: Some(PlayerId::Numeric(99)), ..PlayerRecord::named("Lamine Yamal") };
        assert_eq!(registry.merge_updates(vec![update], EnrichmentMode::Points), 1);
        assert_eq!(registry.player_count(), 3);
        assert_eq!(registry.store().count, 3);
        assert!(registry.get_by_id(&PlayerId::Numeric(99)).is_ok());
    }
}
