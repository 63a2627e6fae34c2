use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RequestConfig;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Market page fetcher with bounded retries
pub struct MarketPageFetcher {
    client: Client,
    max_attempts: u32,
    backoff_base_secs: u64,
}

impl MarketPageFetcher {
    /// Create a fetcher from the request configuration
    pub fn new(config: &RequestConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("Invalid Accept-Language header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            backoff_base_secs: config.backoff_base_secs,
        })
    }

    /// Fetch a page body, retrying with exponential backoff
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url).await {
                Ok(html) => {
                    info!("Fetched {} on attempt {} ({} bytes)", url, attempt, html.len());
                    return Ok(html);
                }
                Err(e) => {
                    warn!("Fetch failed (attempt {}/{}): {:#}", attempt, self.max_attempts, e);
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(backoff_delay(self.backoff_base_secs, attempt)).await;
                    }
                }
            }
        }

        error!("Could not fetch {} after {} attempts", url, self.max_attempts);
        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("no attempts made"))
            .context(format!("Failed to fetch {url} after {} attempts", self.max_attempts)))
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP request failed with status: {}", response.status());
        }

        response.text().await.context("Failed to read response body")
    }
}

/// Wait after a failed attempt: `base^attempt` seconds
pub fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(2, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(0, 3), Duration::ZERO);
    }

    #[test]
    fn test_fetcher_builds_from_default_config() {
        let config = ScraperConfig::default();
        let fetcher = MarketPageFetcher::new(&config.request).unwrap();
        assert_eq!(fetcher.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_fetch_html_gives_up_after_attempts() {
        let mut config = ScraperConfig::default().request;
        config.max_attempts = 2;
        config.backoff_base_secs = 0;
        config.timeout_secs = 1;
        let fetcher = MarketPageFetcher::new(&config).unwrap();

        let err = fetcher.fetch_html("http://127.0.0.1:9/mercado").await.unwrap_err();
        assert!(format!("{err:#}").contains("after 2 attempts"));
    }
}
