//! Shared constants used across the crawler.

/// User agent string presented by the automated browser.
///
/// A realistic desktop Chrome user agent so the search surface serves the
/// same markup a normal browser receives.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Base URL of the search surface. Relative permalinks resolve against it.
pub const DEFAULT_SITE_BASE_URL: &str = "https://x.com/";

/// Selector matching one rendered post in the feed or in a thread view.
pub const POST_SELECTOR: &str = r#"article[data-testid="tweet"]"#;

/// Sentinel author handle used when no author strategy resolves.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Token written to CSV for absent reply-to fields.
pub const MISSING_FIELD_TOKEN: &str = "None";
