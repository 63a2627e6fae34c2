//! Error types for the extraction engine

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that abort an extraction run.
///
/// Per-entity problems (unparseable history payloads, malformed numbers,
/// failed detail lookups) are not represented here; they degrade to empty
/// or absent values and processing continues.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No candidate table has both a player column and a points column
    #[error("no players table found among {candidates} candidate tables")]
    NoTableFound { candidates: usize },

    /// Neither wide `J<n>` columns nor a Jornada/Puntos pair exist
    #[error("the table has no identifiable matchday columns")]
    NoMatchdayColumns,

    /// CSS selector could not be compiled
    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractError {
    /// Create a new selector error
    pub fn selector(msg: impl Into<String>) -> Self {
        Self::Selector(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
