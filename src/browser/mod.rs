//! Browsing-context provider.
//!
//! The crawler drives the source only through [`BrowserSession`]: navigation,
//! script-based scrolling, element lookup and a small set of tab (context)
//! operations. [`ChromiumSession`] implements it over the Chrome DevTools
//! Protocol; tests use an in-memory fixture.

mod chromium;
mod stack;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::ChromiumSession;
pub use stack::ContextStack;

/// Errors raised by a browsing-context provider.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("navigation to {url} timed out")]
    Timeout { url: String },
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("element lookup failed for {locator}: {message}")]
    Lookup { locator: String, message: String },
    #[error("unknown browsing context {0}")]
    UnknownContext(ContextHandle),
    #[error("context stack is full (depth {0})")]
    StackFull(usize),
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// How to find elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{s}"),
            Self::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Outer HTML of one rendered element, captured at lookup time.
///
/// Extraction works on this snapshot, never on the live node, so it cannot
/// fail halfway through because the page re-rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub html: String,
}

impl ElementSnapshot {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// Opaque identifier of one browsing context (tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

impl std::fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The primitives the crawler needs from a browser.
///
/// All page operations act on the current context. `open_context` makes the
/// new context current; `close_context` leaves the current context
/// unspecified, so callers switch explicitly afterwards.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` in the current context.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Current `document.body.scrollHeight`.
    async fn scroll_height(&mut self) -> Result<u64, BrowserError>;

    /// Scroll the current context to its bottom edge.
    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    /// Snapshot every element matching `locator`, in document order.
    async fn find_elements(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<ElementSnapshot>, BrowserError>;

    /// Click every element matching `locator`. Returns how many were clicked.
    async fn click_all(&mut self, locator: &Locator) -> Result<usize, BrowserError>;

    /// Open a new context at `url` and make it current.
    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, BrowserError>;

    /// Make `handle` the current context.
    async fn switch_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError>;

    /// Close `handle`.
    async fn close_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError>;

    /// The context the session started with.
    fn root_context(&self) -> ContextHandle;

    /// Number of contexts currently open, including the root.
    fn open_context_count(&self) -> usize;

    /// Release the browser. Safe to call more than once.
    async fn shutdown(&mut self);
}
