//! Crawl orchestration: the search feed loop and per-thread reply collection.

mod progress;
pub mod query;
mod search;
mod stall;
mod thread;

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::record::PostRecord;

pub use progress::CrawlProgress;
pub use query::SearchQuery;
pub use search::SearchCrawler;
pub use stall::StallCounter;
pub use thread::ThreadCrawler;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid crawl request: {0}")]
    InvalidRequest(String),
    #[error("invalid search URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("could not open search page {url}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },
}

/// Inputs of one crawl run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub topic: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
    /// Maximum number of root posts.
    pub post_limit: usize,
    /// Maximum number of replies collected per root post.
    pub replies_limit: usize,
    /// Restrict to the configured target language.
    pub language_filter: bool,
}

impl CrawlRequest {
    /// Check the request before any browsing happens.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty topic or an inverted date range.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.topic.trim().is_empty() {
            return Err(CrawlError::InvalidRequest("topic cannot be empty".to_string()));
        }
        if self.since > self.until {
            return Err(CrawlError::InvalidRequest(format!(
                "start date {} is after end date {}",
                self.since, self.until
            )));
        }
        Ok(())
    }
}

/// Why the feed loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The post limit was reached.
    LimitReached,
    /// The feed stopped growing before the limit was reached.
    Stalled,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub roots: usize,
    pub replies: usize,
    /// Distinct reply-marked posts skipped in the root feed.
    pub feed_replies_skipped: usize,
    /// Distinct posts rejected by the language filter.
    pub language_rejected: usize,
    /// Rendered posts without a readable permalink.
    pub missing_id: usize,
    pub threads_visited: usize,
    pub feed_scrolls: usize,
}

/// Result of a crawl run: records in emission order plus bookkeeping.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<PostRecord>,
    pub stats: CrawlStats,
    pub termination: Termination,
}

/// Mutable state owned by a single crawl invocation.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Root posts accepted so far; bounded by the post limit.
    processed_roots: HashSet<String>,
    /// Every id emitted, roots and replies.
    seen: HashSet<String>,
    rejected: HashSet<String>,
    feed_replies: HashSet<String>,
    records: Vec<PostRecord>,
    stats: CrawlStats,
}

impl CrawlState {
    #[must_use]
    pub fn processed_roots(&self) -> usize {
        self.processed_roots.len()
    }

    fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id) || self.rejected.contains(id) || self.feed_replies.contains(id)
    }

    fn push_root(&mut self, record: PostRecord) {
        self.processed_roots.insert(record.id.clone());
        self.seen.insert(record.id.clone());
        self.stats.roots += 1;
        self.records.push(record);
    }

    fn push_replies(&mut self, replies: Vec<PostRecord>) {
        self.stats.replies += replies.len();
        self.records.extend(replies);
    }

    fn into_outcome(mut self, termination: Termination) -> CrawlOutcome {
        self.stats.language_rejected = self.rejected.len();
        self.stats.feed_replies_skipped = self.feed_replies.len();
        CrawlOutcome {
            records: self.records,
            stats: self.stats,
            termination,
        }
    }
}
