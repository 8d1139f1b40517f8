//! In-memory browser fixture shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use thread_harvest::browser::{
    BrowserError, BrowserSession, ContextHandle, ElementSnapshot, Locator,
};
use thread_harvest::config::Config;
use thread_harvest::constants::POST_SELECTOR;
use thread_harvest::crawler::{CrawlRequest, SearchCrawler};
use thread_harvest::language::LanguageFilter;

pub const BASE_URL: &str = "https://x.com/";

/// Builder for the markup of one rendered post.
#[derive(Debug, Clone)]
pub struct PostFixture {
    pub id: String,
    pub author: String,
    pub text: String,
    pub replies: u64,
    pub shares: u64,
    pub likes: u64,
    pub reply_marker: bool,
}

impl PostFixture {
    pub fn new(id: &str, author: &str) -> Self {
        Self {
            id: id.to_string(),
            author: author.to_string(),
            text: format!("Post {id} from {author}"),
            replies: 0,
            shares: 0,
            likes: 1,
            reply_marker: false,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn replies(mut self, count: u64) -> Self {
        self.replies = count;
        self
    }

    pub fn likes(mut self, count: u64) -> Self {
        self.likes = count;
        self
    }

    /// Render with a "Replying to" marker, as replies appear in the feed.
    pub fn as_reply(mut self) -> Self {
        self.reply_marker = true;
        self
    }

    pub fn permalink(&self) -> String {
        format!("{BASE_URL}{}/status/{}", self.author, self.id)
    }

    pub fn html(&self) -> String {
        let social = if self.reply_marker {
            r#"<div data-testid="socialContext"><span>Replying to @someone</span></div>"#
        } else {
            ""
        };
        format!(
            r#"<article data-testid="tweet">{social}
<div data-testid="User-Name"><a href="/{author}"><span>{author}</span></a>
<a href="/{author}/status/{id}"><time datetime="2024-01-15T12:00:00.000Z">Jan 15</time></a></div>
<div data-testid="tweetText"><span>{text}</span></div>
<div role="group">
<div data-testid="reply"><span class="css-1">{replies}</span></div>
<div data-testid="retweet"><span class="css-2">{shares}</span></div>
<div data-testid="like"><span class="css-3">{likes}</span></div>
</div></article>"#,
            author = self.author,
            id = self.id,
            text = self.text,
            replies = self.replies,
            shares = self.shares,
            likes = self.likes,
        )
    }
}

/// A scripted page. `initial` posts are rendered on load and each scroll
/// reveals `per_scroll` more, until the list runs out. The page height grows
/// with the number of rendered posts.
#[derive(Debug, Clone)]
pub struct FixturePage {
    posts: Vec<String>,
    initial: usize,
    per_scroll: usize,
}

impl FixturePage {
    /// Every post rendered up front; scrolling never grows the page.
    pub fn new(posts: &[PostFixture]) -> Self {
        Self {
            posts: posts.iter().map(PostFixture::html).collect(),
            initial: posts.len(),
            per_scroll: 0,
        }
    }

    /// Render `initial` posts, then `per_scroll` more per scroll.
    pub fn paged(posts: &[PostFixture], initial: usize, per_scroll: usize) -> Self {
        Self {
            posts: posts.iter().map(PostFixture::html).collect(),
            initial,
            per_scroll,
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    fn visible(&self, scrolls: usize) -> usize {
        (self.initial + self.per_scroll * scrolls).min(self.posts.len())
    }

    fn height(&self, scrolls: usize) -> u64 {
        800 + 400 * self.visible(scrolls) as u64
    }
}

#[derive(Debug)]
struct OpenContext {
    handle: ContextHandle,
    url: Option<String>,
    scrolls: usize,
}

/// `BrowserSession` over scripted pages with context accounting and
/// failure injection.
#[derive(Debug)]
pub struct FixtureSession {
    pages: HashMap<String, FixturePage>,
    contexts: Vec<OpenContext>,
    current: ContextHandle,
    next_handle: u64,
    /// Total scrolls performed per URL.
    pub scrolls: HashMap<String, usize>,
    /// URLs opened in new contexts, in order.
    pub opened: Vec<String>,
    /// Highest number of simultaneously open contexts observed.
    pub max_open: usize,
    /// Element lookups on these URLs fail.
    pub fail_lookup_on: HashSet<String>,
    pub fail_open: bool,
    pub fail_navigate: bool,
    pub shutdowns: usize,
}

impl Default for FixtureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSession {
    pub fn new() -> Self {
        let root = ContextHandle(0);
        Self {
            pages: HashMap::new(),
            contexts: vec![OpenContext {
                handle: root,
                url: None,
                scrolls: 0,
            }],
            current: root,
            next_handle: 1,
            scrolls: HashMap::new(),
            opened: Vec::new(),
            max_open: 1,
            fail_lookup_on: HashSet::new(),
            fail_open: false,
            fail_navigate: false,
            shutdowns: 0,
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, page: FixturePage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn scrolls_on(&self, url: &str) -> usize {
        self.scrolls.get(url).copied().unwrap_or(0)
    }

    pub fn current_context(&self) -> ContextHandle {
        self.current
    }

    fn context_mut(&mut self) -> Result<&mut OpenContext, BrowserError> {
        let current = self.current;
        self.contexts
            .iter_mut()
            .find(|c| c.handle == current)
            .ok_or(BrowserError::UnknownContext(current))
    }

    fn current_page(&self) -> Option<(&FixturePage, usize)> {
        let context = self.contexts.iter().find(|c| c.handle == self.current)?;
        let page = self.pages.get(context.url.as_deref()?)?;
        Some((page, context.scrolls))
    }

    fn current_url(&self) -> Option<String> {
        self.contexts
            .iter()
            .find(|c| c.handle == self.current)
            .and_then(|c| c.url.clone())
    }
}

#[async_trait]
impl BrowserSession for FixtureSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.fail_navigate {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        let context = self.context_mut()?;
        context.url = Some(url.to_string());
        context.scrolls = 0;
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<u64, BrowserError> {
        Ok(self
            .current_page()
            .map_or(800, |(page, scrolls)| page.height(scrolls)))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        let context = self.context_mut()?;
        context.scrolls += 1;
        if let Some(url) = context.url.clone() {
            *self.scrolls.entry(url).or_default() += 1;
        }
        Ok(())
    }

    async fn find_elements(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<ElementSnapshot>, BrowserError> {
        if let Some(url) = self.current_url() {
            if self.fail_lookup_on.contains(&url) {
                return Err(BrowserError::Lookup {
                    locator: locator.to_string(),
                    message: "node is detached from document".to_string(),
                });
            }
        }
        if *locator != Locator::css(POST_SELECTOR) {
            return Ok(Vec::new());
        }
        Ok(self
            .current_page()
            .map(|(page, scrolls)| {
                page.posts[..page.visible(scrolls)]
                    .iter()
                    .map(ElementSnapshot::new)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click_all(&mut self, _locator: &Locator) -> Result<usize, BrowserError> {
        Ok(0)
    }

    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, BrowserError> {
        if self.fail_open {
            return Err(BrowserError::Timeout {
                url: url.to_string(),
            });
        }
        let handle = ContextHandle(self.next_handle);
        self.next_handle += 1;
        self.contexts.push(OpenContext {
            handle,
            url: Some(url.to_string()),
            scrolls: 0,
        });
        self.current = handle;
        self.opened.push(url.to_string());
        self.max_open = self.max_open.max(self.contexts.len());
        Ok(handle)
    }

    async fn switch_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        if !self.contexts.iter().any(|c| c.handle == handle) {
            return Err(BrowserError::UnknownContext(handle));
        }
        self.current = handle;
        Ok(())
    }

    async fn close_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        let before = self.contexts.len();
        self.contexts.retain(|c| c.handle != handle);
        if self.contexts.len() == before {
            return Err(BrowserError::UnknownContext(handle));
        }
        Ok(())
    }

    fn root_context(&self) -> ContextHandle {
        ContextHandle(0)
    }

    fn open_context_count(&self) -> usize {
        self.contexts.len()
    }

    async fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}

/// Rejects any text containing `[foreign]`.
#[derive(Debug, Clone, Copy)]
pub struct MarkerFilter;

impl LanguageFilter for MarkerFilter {
    fn is_target_language(&self, text: &str) -> bool {
        !text.contains("[foreign]")
    }
}

pub fn request(post_limit: usize, replies_limit: usize) -> CrawlRequest {
    CrawlRequest {
        topic: "rust lang".to_string(),
        since: thread_harvest::crawler::query::parse_date("2024-01-01").unwrap(),
        until: thread_harvest::crawler::query::parse_date("2024-01-31").unwrap(),
        post_limit,
        replies_limit,
        language_filter: false,
    }
}

pub fn crawler() -> SearchCrawler {
    SearchCrawler::new(Config::for_testing(), Box::new(MarkerFilter)).unwrap()
}
