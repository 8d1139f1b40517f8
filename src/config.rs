use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::constants::{DEFAULT_SITE_BASE_URL, DEFAULT_USER_AGENT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Crawler configuration loaded from environment variables.
///
/// Everything here is tuning: per-run inputs (topic, dates, limits) come from
/// the command line as a [`crate::crawler::CrawlRequest`].
#[derive(Debug, Clone)]
pub struct Config {
    // Source
    pub site_base_url: String,

    // Browser
    pub chrome_path: Option<String>,
    pub page_timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,

    // Pacing
    pub page_settle_delay: Duration,
    pub dismiss_delay: Duration,
    pub feed_scroll_delay: Duration,
    pub thread_scroll_delay: Duration,

    // Termination
    pub feed_max_stalls: u32,
    pub thread_max_stalls: u32,

    // Language
    pub target_language: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Source
            site_base_url: env_or_default("SITE_BASE_URL", DEFAULT_SITE_BASE_URL),

            // Browser
            chrome_path: optional_env("CHROME_PATH"),
            page_timeout: Duration::from_secs(parse_env_u64("PAGE_TIMEOUT_SECS", 30)?),
            viewport_width: parse_env_u32("VIEWPORT_WIDTH", 1920)?,
            viewport_height: parse_env_u32("VIEWPORT_HEIGHT", 1080)?,
            user_agent: env_or_default("USER_AGENT", DEFAULT_USER_AGENT),

            // Pacing
            page_settle_delay: Duration::from_millis(parse_env_u64("PAGE_SETTLE_MS", 5000)?),
            dismiss_delay: Duration::from_millis(parse_env_u64("DISMISS_DELAY_MS", 1000)?),
            feed_scroll_delay: Duration::from_millis(parse_env_u64("FEED_SCROLL_DELAY_MS", 3000)?),
            thread_scroll_delay: Duration::from_millis(parse_env_u64(
                "THREAD_SCROLL_DELAY_MS",
                2000,
            )?),

            // Termination
            feed_max_stalls: parse_env_u32("FEED_MAX_STALLS", 50)?,
            thread_max_stalls: parse_env_u32("THREAD_MAX_STALLS", 10)?,

            // Language
            target_language: env_or_default("TARGET_LANGUAGE", "en").to_lowercase(),
        })
    }

    /// Configuration with every delay zeroed, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            chrome_path: None,
            page_timeout: Duration::from_secs(5),
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_settle_delay: Duration::ZERO,
            dismiss_delay: Duration::ZERO,
            feed_scroll_delay: Duration::ZERO,
            thread_scroll_delay: Duration::ZERO,
            feed_max_stalls: 50,
            thread_max_stalls: 10,
            target_language: "en".to_string(),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_max_stalls == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FEED_MAX_STALLS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.thread_max_stalls == 0 {
            return Err(ConfigError::InvalidValue {
                name: "THREAD_MAX_STALLS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.page_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "PAGE_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Err(e) = self.base_url() {
            return Err(ConfigError::InvalidValue {
                name: "SITE_BASE_URL".to_string(),
                message: e.to_string(),
            });
        }
        if self.target_language.len() != 2 {
            return Err(ConfigError::InvalidValue {
                name: "TARGET_LANGUAGE".to_string(),
                message: format!(
                    "expected a two-letter language code, got '{}'",
                    self.target_language
                ),
            });
        }
        Ok(())
    }

    /// Parsed site base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `site_base_url` is not an absolute URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.site_base_url)
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
