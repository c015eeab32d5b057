//! Connector configuration with defaults matching the ComicWiki plugin behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";
const DEFAULT_SITE_DOMAIN: &str = "comicwiki.dk";
const DEFAULT_SITE_ORIGIN: &str = "https://comicwiki.dk";
const DEFAULT_MAX_LINKS_PER_SEARCH: usize = 4;
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SPAWN_STAGGER_MS: u64 = 100;
/// One worker per candidate a default query can produce: a preset page plus
/// two full search batches.
const DEFAULT_MAX_CONCURRENT_WORKERS: usize = 1 + 2 * DEFAULT_MAX_LINKS_PER_SEARCH;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is outside its accepted range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A URL-valued setting does not parse as an absolute URL.
    #[error("invalid URL for `{field}`: '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    /// The JSON document could not be decoded.
    #[error("failed to parse connector config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for discovery, workers, and the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Search engine endpoint receiving `q=site:<domain> <terms>`.
    pub search_endpoint: String,
    /// Domain restricting search results.
    pub site_domain: String,
    /// Origin used to qualify relative links found on wiki pages.
    pub site_origin: String,
    /// Result links harvested per search query.
    pub max_links_per_search: usize,
    /// Timeout for a single candidate page fetch.
    pub page_timeout_secs: u64,
    /// Timeout for search and cover fetches when the query carries none.
    pub default_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Delay between successive worker spawns.
    pub spawn_stagger_ms: u64,
    /// Upper bound on concurrently running candidate workers.
    pub max_concurrent_workers: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            site_domain: DEFAULT_SITE_DOMAIN.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            max_links_per_search: DEFAULT_MAX_LINKS_PER_SEARCH,
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            spawn_stagger_ms: DEFAULT_SPAWN_STAGGER_MS,
            max_concurrent_workers: DEFAULT_MAX_CONCURRENT_WORKERS,
        }
    }
}

impl ConnectorConfig {
    /// Parses and validates a JSON document; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or a value is invalid.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("search_endpoint", &self.search_endpoint)?;
        validate_url("site_origin", &self.site_origin)?;
        if self.site_domain.trim().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "site_domain",
                value: format!("'{}'", self.site_domain),
                expected: "non-empty domain",
            });
        }
        validate_range("max_links_per_search", self.max_links_per_search as u64, 1, 20, "1..=20")?;
        validate_range("page_timeout_secs", self.page_timeout_secs, 1, 3600, "1..=3600")?;
        validate_range("default_timeout_secs", self.default_timeout_secs, 1, 3600, "1..=3600")?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600, "1..=3600")?;
        validate_range("spawn_stagger_ms", self.spawn_stagger_ms, 0, 5000, "0..=5000")?;
        validate_range(
            "max_concurrent_workers",
            self.max_concurrent_workers as u64,
            1,
            32,
            "1..=32",
        )?;
        Ok(())
    }

    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn spawn_stagger(&self) -> Duration {
        Duration::from_millis(self.spawn_stagger_ms)
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
}

fn validate_range(
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        })
    }
}
