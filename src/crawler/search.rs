//! The search feed loop.

use tracing::{debug, info, warn};
use url::Url;

use super::progress::CrawlProgress;
use super::query::SearchQuery;
use super::stall::StallCounter;
use super::thread::ThreadCrawler;
use super::{CrawlError, CrawlOutcome, CrawlRequest, CrawlState, Termination};
use crate::browser::{BrowserError, BrowserSession, ContextStack, Locator};
use crate::config::Config;
use crate::constants::POST_SELECTOR;
use crate::extract::FieldExtractor;
use crate::language::LanguageFilter;
use crate::record::{PostRecord, ThreadRoot};

/// Labels of transient prompts dismissed after the search page loads.
const INTERSTITIAL_LABELS: &[&str] = &["Dismiss", "Not now"];

/// Drives the search feed: scrolls, deduplicates, and hands every root post
/// with replies to a [`ThreadCrawler`].
pub struct SearchCrawler {
    config: Config,
    base_url: Url,
    extractor: FieldExtractor,
    filter: Box<dyn LanguageFilter>,
    progress: CrawlProgress,
}

impl SearchCrawler {
    /// Create a crawler with the default extraction policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn new(config: Config, filter: Box<dyn LanguageFilter>) -> Result<Self, CrawlError> {
        let base_url = config.base_url()?;
        let extractor = FieldExtractor::new(base_url.clone());
        Ok(Self {
            config,
            base_url,
            extractor,
            filter,
            progress: CrawlProgress::hidden(),
        })
    }

    /// Replace the field extractor (e.g. to pin the fallback clock).
    #[must_use]
    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Report progress on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: CrawlProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Search URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built from the base URL.
    pub fn search_url(&self, request: &CrawlRequest) -> Result<String, CrawlError> {
        let query = SearchQuery {
            topic: request.topic.clone(),
            since: request.since,
            until: request.until,
            language: request
                .language_filter
                .then(|| self.config.target_language.clone()),
        };
        Ok(query.to_url(&self.base_url)?)
    }

    /// Run one crawl.
    ///
    /// Only an invalid request or a failure to open the search page is an
    /// error. Everything after that is best effort: the outcome holds
    /// whatever was collected before the limits or the stall threshold ended
    /// the loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the search page cannot
    /// be loaded.
    pub async fn crawl<S>(
        &self,
        session: &mut S,
        request: &CrawlRequest,
    ) -> Result<CrawlOutcome, CrawlError>
    where
        S: BrowserSession + ?Sized,
    {
        request.validate()?;
        let url = self.search_url(request)?;

        info!(
            topic = %request.topic,
            post_limit = request.post_limit,
            replies_limit = request.replies_limit,
            language_filter = request.language_filter,
            "Starting crawl"
        );
        info!(url = %url, "Accessing search");

        session
            .navigate(&url)
            .await
            .map_err(|source| CrawlError::Navigation {
                url: url.clone(),
                source,
            })?;
        tokio::time::sleep(self.config.page_settle_delay).await;
        self.dismiss_interstitials(session).await;

        let filter = request.language_filter.then_some(self.filter.as_ref());
        let threads = ThreadCrawler::new(&self.extractor, filter, &self.config);
        let mut stack = ContextStack::new(session.root_context());
        let mut state = CrawlState::default();

        let initial_height = session.scroll_height().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read initial page height");
            0
        });
        let mut stalls = StallCounter::new(initial_height, self.config.feed_max_stalls);

        while state.processed_roots() < request.post_limit && !stalls.is_exhausted() {
            if let Err(e) = self
                .feed_pass(session, &mut stack, &threads, request, &mut state)
                .await
            {
                warn!(error = %e, "Error during feed pass");
                stalls.record_failure();
                continue;
            }

            if state.processed_roots() >= request.post_limit {
                break;
            }

            state.stats.feed_scrolls += 1;
            match self.scroll(session).await {
                Ok(height) => {
                    if stalls.observe(height) {
                        debug!("New content loaded, continuing to scroll");
                    } else {
                        info!(
                            stalls = stalls.stalls(),
                            max = stalls.threshold(),
                            "No new content loaded"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Error during feed scroll");
                    stalls.record_failure();
                }
            }
        }

        self.progress.finish();

        let termination = if state.processed_roots() >= request.post_limit {
            Termination::LimitReached
        } else {
            Termination::Stalled
        };

        let outcome = state.into_outcome(termination);
        info!(
            records = outcome.records.len(),
            roots = outcome.stats.roots,
            replies = outcome.stats.replies,
            termination = ?outcome.termination,
            "Crawl finished"
        );
        Ok(outcome)
    }

    /// Best-effort dismissal of cookie/login prompts.
    async fn dismiss_interstitials<S>(&self, session: &mut S)
    where
        S: BrowserSession + ?Sized,
    {
        for label in INTERSTITIAL_LABELS {
            let locator = Locator::xpath(format!("//span[contains(text(), '{label}')]"));
            match session.click_all(&locator).await {
                Ok(0) => {}
                Ok(clicked) => {
                    debug!(label = %label, clicked, "Dismissed prompt");
                    tokio::time::sleep(self.config.dismiss_delay * clicked as u32).await;
                }
                Err(e) => debug!(label = %label, error = %e, "Prompt dismissal failed"),
            }
        }
    }

    /// Scroll the feed and return the new page height.
    async fn scroll<S>(&self, session: &mut S) -> Result<u64, BrowserError>
    where
        S: BrowserSession + ?Sized,
    {
        session.scroll_to_bottom().await?;
        tokio::time::sleep(self.config.feed_scroll_delay).await;
        session.scroll_height().await
    }

    /// Process every currently rendered post once.
    async fn feed_pass<S>(
        &self,
        session: &mut S,
        stack: &mut ContextStack,
        threads: &ThreadCrawler<'_>,
        request: &CrawlRequest,
        state: &mut CrawlState,
    ) -> Result<(), BrowserError>
    where
        S: BrowserSession + ?Sized,
    {
        let elements = session.find_elements(&Locator::css(POST_SELECTOR)).await?;
        if !elements.is_empty() {
            debug!(count = elements.len(), "Found post elements on page");
        }

        for snapshot in &elements {
            if state.processed_roots() >= request.post_limit {
                break;
            }

            let post = self.extractor.extract(snapshot);
            let Some(id) = post.id else {
                state.stats.missing_id += 1;
                continue;
            };
            if state.has_seen(&id) {
                continue;
            }

            // Replies are only collected from their thread view.
            if post.is_reply {
                state.feed_replies.insert(id);
                continue;
            }

            if request.language_filter
                && !post.text.is_empty()
                && !self.filter.is_target_language(&post.text)
            {
                debug!(post_id = %id, "Skipping post outside target language");
                state.rejected.insert(id);
                continue;
            }

            let reply_count = post.metrics.replies;
            let author = post.author_handle.clone();
            state.push_root(PostRecord::root(
                id.clone(),
                post.author_handle,
                post.timestamp,
                post.text,
                post.metrics,
            ));
            self.progress.root_collected(state.records.len());

            info!(
                n = state.processed_roots(),
                post_id = %id,
                author = %author,
                likes = post.metrics.likes,
                shares = post.metrics.shares,
                comments = reply_count,
                "Processed post"
            );

            if reply_count == 0 || request.replies_limit == 0 {
                continue;
            }

            let Some(permalink) = post.permalink else {
                warn!(post_id = %id, "Post has replies but no resolvable permalink");
                continue;
            };

            let root = ThreadRoot {
                permalink,
                id,
                author,
            };
            state.stats.threads_visited += 1;
            let replies = threads
                .collect_replies(session, stack, &root, request.replies_limit, &mut state.seen)
                .await;
            state.push_replies(replies);
            self.progress.replies_collected(state.records.len());
        }

        Ok(())
    }
}
