//! Error types for the player registry

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The existing store could not be loaded, so a partial write would lose it
    #[error("Refusing to overwrite unreadable store {0}")]
    UnreadableStore(String),

    /// No record matches the requested id or name
    #[error("Player '{0}' not found in registry")]
    PlayerNotFound(String),
}
