//! Endpoint configuration for the static feeds.

use std::env;
use std::time::Duration;

/// Default root of the financials and valuation files.
pub const DEFAULT_DATA_BASE_URL: &str =
    "https://raw.githubusercontent.com/kungsiuchun/ValuationCalculation/refs/heads/master";

/// Default daily bars CSV for the Dow 30 basket.
pub const DEFAULT_BARS_URL: &str =
    "https://raw.githubusercontent.com/kungsiuchun/stock-trading-python-app/main/dow30.csv";

/// Default site root serving `stats.json`.
pub const DEFAULT_SITE_URL: &str = "https://kungsiuchun.github.io/my-portfolio-vibecoding";

/// Where the feed client looks for each resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    /// Root holding `data/processed/*` and `data/results/*`.
    pub data_base_url: String,
    /// Full URL of the daily bars CSV.
    pub bars_url: String,
    /// Site root holding `stats.json`.
    pub site_url: String,
    /// Append a `t=<millis>` query so CDN caches are bypassed.
    pub cache_bust: bool,
    /// Per-request timeout; `None` waits until the request is cancelled.
    pub timeout: Option<Duration>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            bars_url: DEFAULT_BARS_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            cache_bust: true,
            timeout: None,
        }
    }
}

impl FeedConfig {
    /// Defaults overridden by `FOLIO_FEED_BASE_URL`, `FOLIO_BARS_URL` and
    /// `FOLIO_SITE_URL` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("FOLIO_FEED_BASE_URL") {
            config.data_base_url = url;
        }
        if let Ok(url) = env::var("FOLIO_BARS_URL") {
            config.bars_url = url;
        }
        if let Ok(url) = env::var("FOLIO_SITE_URL") {
            config.site_url = url;
        }
        config
    }

    /// Points every resource at one host, as used with a local mirror.
    #[must_use]
    pub fn with_base(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/');
        Self {
            data_base_url: base.to_string(),
            bars_url: format!("{base}/dow30.csv"),
            site_url: base.to_string(),
            ..Self::default()
        }
    }

    /// Enables or disables the cache-busting query.
    #[must_use]
    pub const fn cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_trims_slash() {
        let config = FeedConfig::with_base("http://localhost:8080/");
        assert_eq!(config.data_base_url, "http://localhost:8080");
        assert_eq!(config.bars_url, "http://localhost:8080/dow30.csv");
        assert_eq!(config.site_url, "http://localhost:8080");
        assert!(config.cache_bust);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_builder_toggles() {
        let config = FeedConfig::default()
            .cache_bust(false)
            .timeout(Duration::from_secs(5));
        assert!(!config.cache_bust);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
