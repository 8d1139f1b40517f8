//! Reply collection inside a single thread view.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::stall::StallCounter;
use crate::browser::{BrowserError, BrowserSession, ContextStack, Locator};
use crate::config::Config;
use crate::constants::POST_SELECTOR;
use crate::extract::FieldExtractor;
use crate::language::LanguageFilter;
use crate::record::{PostRecord, ThreadRoot};

/// Collects replies by opening a root post's permalink in its own context.
///
/// Replies are attached to the thread root regardless of which post in the
/// thread they actually answer.
pub struct ThreadCrawler<'a> {
    extractor: &'a FieldExtractor,
    filter: Option<&'a dyn LanguageFilter>,
    settle_delay: Duration,
    scroll_delay: Duration,
    max_stalls: u32,
}

impl<'a> ThreadCrawler<'a> {
    /// `filter` is applied only when present.
    #[must_use]
    pub fn new(
        extractor: &'a FieldExtractor,
        filter: Option<&'a dyn LanguageFilter>,
        config: &Config,
    ) -> Self {
        Self {
            extractor,
            filter,
            settle_delay: config.page_settle_delay,
            scroll_delay: config.thread_scroll_delay,
            max_stalls: config.thread_max_stalls,
        }
    }

    /// Collect up to `limit` replies to `root`.
    ///
    /// `seen` holds ids already emitted in this run; collected reply ids are
    /// added to it. The thread context is always closed and the previous
    /// context refocused before returning. Failures end collection early but
    /// never propagate: the caller gets whatever was gathered.
    pub async fn collect_replies<S>(
        &self,
        session: &mut S,
        stack: &mut ContextStack,
        root: &ThreadRoot,
        limit: usize,
        seen: &mut HashSet<String>,
    ) -> Vec<PostRecord>
    where
        S: BrowserSession + ?Sized,
    {
        let mut replies = Vec::new();
        if limit == 0 {
            return replies;
        }

        debug!(post_id = %root.id, url = %root.permalink, "Getting replies");

        if let Err(e) = stack.push(session, &root.permalink).await {
            warn!(post_id = %root.id, error = %e, "Failed to open thread");
            return replies;
        }

        if let Err(e) = self
            .collect_in_context(session, root, limit, seen, &mut replies)
            .await
        {
            warn!(
                post_id = %root.id,
                collected = replies.len(),
                error = %e,
                "Thread collection aborted"
            );
        }

        if let Err(e) = stack.pop(session).await {
            warn!(post_id = %root.id, error = %e, "Failed to restore context after thread");
        }
        let open = session.open_context_count();
        if open > stack.depth() {
            warn!(
                post_id = %root.id,
                open,
                tracked = stack.depth(),
                "Browsing contexts left open after thread"
            );
        }

        info!(post_id = %root.id, replies = replies.len(), "Collected replies");
        replies
    }

    async fn collect_in_context<S>(
        &self,
        session: &mut S,
        root: &ThreadRoot,
        limit: usize,
        seen: &mut HashSet<String>,
        replies: &mut Vec<PostRecord>,
    ) -> Result<(), BrowserError>
    where
        S: BrowserSession + ?Sized,
    {
        tokio::time::sleep(self.settle_delay).await;

        let locator = Locator::css(POST_SELECTOR);
        let mut stalls = StallCounter::new(session.scroll_height().await?, self.max_stalls);

        while replies.len() < limit && !stalls.is_exhausted() {
            let elements = session.find_elements(&locator).await?;

            // Index 0 is the root post rendered at the top of its own thread.
            for snapshot in elements.iter().skip(1) {
                if replies.len() >= limit {
                    break;
                }

                let post = self.extractor.extract(snapshot);
                let Some(id) = post.id else {
                    continue;
                };
                if seen.contains(&id) {
                    continue;
                }

                if let Some(filter) = self.filter {
                    if !post.text.is_empty() && !filter.is_target_language(&post.text) {
                        debug!(post_id = %id, "Skipping reply outside target language");
                        continue;
                    }
                }

                debug!(
                    post_id = %id,
                    author = %post.author_handle,
                    likes = post.metrics.likes,
                    shares = post.metrics.shares,
                    comments = post.metrics.replies,
                    "Processed reply"
                );

                seen.insert(id.clone());
                replies.push(PostRecord::reply(
                    root,
                    id,
                    post.author_handle,
                    post.timestamp,
                    post.text,
                    post.metrics,
                ));
            }

            if replies.len() >= limit {
                break;
            }

            session.scroll_to_bottom().await?;
            tokio::time::sleep(self.scroll_delay).await;
            let height = session.scroll_height().await?;
            if !stalls.observe(height) {
                debug!(
                    post_id = %root.id,
                    stalls = stalls.stalls(),
                    max = stalls.threshold(),
                    "No new replies loaded"
                );
            }
        }

        Ok(())
    }
}
