//! Field extraction from rendered post snapshots.
//!
//! Extraction never fails: every field has a documented default, and a post
//! that yields nothing useful still produces an [`ExtractedPost`]. Whether a
//! post without an id is usable is the crawler's decision.

pub mod engagement;
pub mod strategies;

use chrono::{DateTime, SecondsFormat, Utc};
use scraper::Html;
use url::Url;

use crate::browser::ElementSnapshot;
use crate::constants::UNKNOWN_AUTHOR;
use crate::record::Metrics;

pub use engagement::parse_count;

/// Defaults applied when a field cannot be read.
#[derive(Debug, Clone)]
pub struct ExtractPolicy {
    /// Author handle used when no author strategy resolves.
    pub unknown_author: String,
    /// Clock used for posts with no readable timestamp.
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            unknown_author: UNKNOWN_AUTHOR.to_string(),
            clock: Utc::now,
        }
    }
}

/// Everything read from one post, before it is classified as root or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub id: Option<String>,
    /// Absolute permalink, when the status link resolves against the base URL.
    pub permalink: Option<String>,
    pub author_handle: String,
    pub text: String,
    pub timestamp: String,
    pub is_reply: bool,
    pub metrics: Metrics,
}

/// Best-effort reader for post snapshots.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    base_url: Url,
    policy: ExtractPolicy,
}

impl FieldExtractor {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self::with_policy(base_url, ExtractPolicy::default())
    }

    #[must_use]
    pub fn with_policy(base_url: Url, policy: ExtractPolicy) -> Self {
        Self { base_url, policy }
    }

    /// Read a post snapshot.
    #[must_use]
    pub fn extract(&self, snapshot: &ElementSnapshot) -> ExtractedPost {
        let fragment = Html::parse_fragment(&snapshot.html);
        let post = fragment.root_element();

        let href = strategies::status_href(&post);
        let id = href.as_deref().and_then(strategies::id_from_permalink);
        let permalink = href
            .as_deref()
            .and_then(|h| self.base_url.join(h).ok())
            .map(String::from);

        let author_handle = strategies::first_match(&post, strategies::AUTHOR_STRATEGIES)
            .unwrap_or_else(|| self.policy.unknown_author.clone());

        let timestamp = strategies::timestamp(&post).unwrap_or_else(|| {
            (self.policy.clock)().to_rfc3339_opts(SecondsFormat::Millis, true)
        });

        ExtractedPost {
            id,
            permalink,
            author_handle,
            text: strategies::text(&post).unwrap_or_default(),
            timestamp,
            is_reply: strategies::is_reply(&post),
            metrics: strategies::first_match(&post, strategies::METRIC_STRATEGIES)
                .unwrap_or_default(),
        }
    }
}
