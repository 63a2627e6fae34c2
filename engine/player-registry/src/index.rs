//! Identity index over an in-progress player list.
//!
//! A record is identified by its id, in text or integer form, and failing
//! that by its casefolded canonical name. The index maps every key to a
//! position in the list it was built from; the list itself owns the records.

use std::collections::HashMap;

use player_scraper::name::name_key;
use player_scraper::{PlayerId, PlayerRecord};

#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    by_text_id: HashMap<String, usize>,
    by_int_id: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

impl IdentityIndex {
    /// Index every record of `records`; later duplicates win
    pub fn build(records: &[PlayerRecord]) -> Self {
        let mut index = Self::default();
        for (position, record) in records.iter().enumerate() {
            index.insert(record, position);
        }
        index
    }

    /// Point the keys of `record` at `position`
    pub fn insert(&mut self, record: &PlayerRecord, position: usize) {
        if let Some(id) = &record.id {
            let text = id.as_text();
            if !text.is_empty() {
                self.by_text_id.insert(text, position);
            }
            if let Some(int) = id.as_int() {
                self.by_int_id.insert(int, position);
            }
        }
        if let Some(key) = name_key(&record.name) {
            self.by_name.insert(key, position);
        }
    }

    /// Position of the record sharing the id of `record`, else its name
    pub fn resolve(&self, record: &PlayerRecord) -> Option<usize> {
        record
            .id
            .as_ref()
            .and_then(|id| self.position_of_id(id))
            .or_else(|| self.position_of_name(&record.name))
    }

    pub fn position_of_id(&self, id: &PlayerId) -> Option<usize> {
        self.by_text_id
            .get(&id.as_text())
            .or_else(|| id.as_int().and_then(|int| self.by_int_id.get(&int)))
            .copied()
    }

    /// Position of the record whose canonical name matches, ignoring case
    pub fn position_of_name(&self, name: &str) -> Option<usize> {
        name_key(name).and_then(|key| self.by_name.get(&key)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_text_id.is_empty() && self.by_int_id.is_empty()
    }
}
