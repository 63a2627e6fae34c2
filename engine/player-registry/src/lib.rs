//! Player Registry - the persisted LaLiga Fantasy market store
//!
//! Loads and saves `market.json`, and merges freshly extracted player
//! records into it by stable identity (market id, else canonical name).

pub mod error;
pub mod index;
pub mod merge;
pub mod registry;
pub mod types;

#[cfg(test)]
mod integration_tests;

pub use error::{RegistryError, Result};
pub use index::IdentityIndex;
pub use merge::{merge_players, MergeOutcome};
pub use registry::PlayerRegistry;
pub use types::RecordStore;
