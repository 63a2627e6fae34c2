use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Configuration for the market scrapers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Market page fetching
    pub request: RequestConfig,

    /// Player-detail API used for points histories
    pub player_api: PlayerApiConfig,

    /// Output locations
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Market page URL
    pub market_url: String,

    /// Attempts before giving up on a page
    pub max_attempts: u32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Backoff base; the wait after attempt `n` is `base^n` seconds
    pub backoff_base_secs: u64,

    pub user_agent: String,

    pub accept_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerApiConfig {
    /// Base URL, the player id is appended as a path segment
    pub base_url: String,

    /// Value of the `competition` query parameter
    pub competition: String,

    /// Bounded wait per lookup in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Persisted record store
    pub store_path: String,

    /// Long (player, matchday) export
    pub long_csv: String,

    /// Players × matchdays export
    pub pivot_csv: String,
}

const DEFAULT_MARKET_URL: &str = "https://www.futbolfantasy.com/analytics/laliga-fantasy/mercado";

const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request: RequestConfig {
                market_url: DEFAULT_MARKET_URL.to_string(),
                max_attempts: 3,
                timeout_secs: 15,
                backoff_base_secs: 2,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                accept_language: "es-ES,es;q=0.9,en;q=0.8".to_string(),
            },
            player_api: PlayerApiConfig {
                base_url: "https://www.laligafantasymarca.com/api/v3/player".to_string(),
                competition: "laliga-fantasy".to_string(),
                timeout_secs: 10,
            },
            output: OutputConfig {
                store_path: "market.json".to_string(),
                long_csv: "puntos_por_jornada_largo.csv".to_string(),
                pivot_csv: "puntos_por_jornada_pivot.csv".to_string(),
            },
        }
    }
}

impl ScraperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FANTASY_MARKET_URL") {
            config.request.market_url = url;
        }

        if let Ok(attempts) = std::env::var("FANTASY_MAX_ATTEMPTS") {
            config.request.max_attempts = attempts.parse().map_err(|_| {
                ExtractError::config(format!("invalid FANTASY_MAX_ATTEMPTS: {attempts}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("FANTASY_TIMEOUT_SECS") {
            config.request.timeout_secs = timeout.parse().map_err(|_| {
                ExtractError::config(format!("invalid FANTASY_TIMEOUT_SECS: {timeout}"))
            })?;
        }

        if let Ok(base) = std::env::var("FANTASY_PLAYER_API_BASE") {
            config.player_api.base_url = base;
        }

        if let Ok(competition) = std::env::var("FANTASY_COMPETITION") {
            config.player_api.competition = competition;
        }

        if let Ok(path) = std::env::var("FANTASY_STORE_PATH") {
            config.output.store_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request.max_attempts == 0 {
            return Err(ExtractError::config("max_attempts must be at least 1"));
        }
        if self.request.timeout_secs == 0 {
            return Err(ExtractError::config("request timeout must be non-zero"));
        }
        if self.player_api.timeout_secs == 0 {
            return Err(ExtractError::config("player API timeout must be non-zero"));
        }
        if self.request.market_url.trim().is_empty() {
            return Err(ExtractError::config("market_url is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScraperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request.max_attempts, 3);
        assert_eq!(config.player_api.competition, "laliga-fantasy");
        assert_eq!(config.output.store_path, "market.json");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = ScraperConfig::default();
        config.request.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ExtractError::Config(_))));

        let mut config = ScraperConfig::default();
        config.player_api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = ScraperConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScraperConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request.market_url, config.request.market_url);
        assert_eq!(back.output.pivot_csv, "puntos_por_jornada_pivot.csv");
    }
}
