//! [`BrowserSession`] over headless Chrome/Chromium via the DevTools protocol.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserSession, ContextHandle, ElementSnapshot, Locator};
use crate::config::Config;

const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Open contexts keyed by handle.
///
/// An entry is dropped only once its close has succeeded, so a tab that
/// refuses to close stays tracked and is still counted.
#[derive(Debug)]
struct ContextTable<P> {
    entries: Vec<(ContextHandle, P)>,
}

impl<P: Clone> ContextTable<P> {
    fn new(root: ContextHandle, page: P) -> Self {
        Self {
            entries: vec![(root, page)],
        }
    }

    fn get(&self, handle: ContextHandle) -> Result<&P, BrowserError> {
        self.entries
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, page)| page)
            .ok_or(BrowserError::UnknownContext(handle))
    }

    fn insert(&mut self, handle: ContextHandle, page: P) {
        self.entries.push((handle, page));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// Close `handle` with `close` and forget it if that succeeded.
    async fn close_with<F, Fut, E>(
        &mut self,
        handle: ContextHandle,
        close: F,
    ) -> Result<(), BrowserError>
    where
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let page = self.get(handle)?.clone();
        if let Err(e) = close(page).await {
            warn!(
                context = %handle,
                error = %e,
                "Browsing context could not be closed, still tracked"
            );
            return Err(BrowserError::Protocol(format!(
                "failed to close context {handle}: {e}"
            )));
        }
        self.entries.retain(|(h, _)| *h != handle);
        Ok(())
    }
}

/// A running browser with one page per browsing context.
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    pages: ContextTable<Page>,
    root: ContextHandle,
    current: ContextHandle,
    next_handle: u64,
    page_timeout: Duration,
}

impl ChromiumSession {
    /// Launch a browser and open the root context on a blank page.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be configured or started.
    pub async fn launch(config: &Config, headless: bool) -> Result<Self, BrowserError> {
        info!(headless, "Launching browser");

        let mut config_builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.page_timeout)
            .no_sandbox()
            .with_head()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .arg(format!(
                "--window-size={},{}",
                config.viewport_width, config.viewport_height
            ))
            .arg(format!("--user-agent={}", config.user_agent));

        if headless {
            config_builder = config_builder.arg("--headless=new");
        }

        if let Some(ref chrome_path) = config.chrome_path {
            config_builder = config_builder.chrome_executable(chrome_path);
        }

        let browser_config = config_builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Spawn handler in background
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let root_page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to open root page: {e}")))?;

        let root = ContextHandle(0);
        info!("Browser ready");

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            pages: ContextTable::new(root, root_page),
            root,
            current: root,
            next_handle: 1,
            page_timeout: config.page_timeout,
        })
    }

    fn current_page(&self) -> Result<&Page, BrowserError> {
        self.pages.get(self.current)
    }

    async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    async fn evaluate<T>(&self, script: String) -> Result<T, BrowserError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.current_page()?
            .evaluate_expression(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

/// JavaScript returning the outer HTML of every match of `locator`.
fn snapshot_script(locator: &Locator) -> Result<String, BrowserError> {
    let literal = |s: &str| {
        serde_json::to_string(s).map_err(|e| BrowserError::Script(e.to_string()))
    };

    Ok(match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({})).map((e) => e.outerHTML)",
            literal(selector)?
        ),
        Locator::XPath(expression) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) {{ const n = r.snapshotItem(i); \
             out.push(n.outerHTML || n.textContent || ''); }} return out; }})()",
            literal(expression)?
        ),
    })
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(url = %url, context = %self.current, "Navigating");
        Self::goto(self.current_page()?, url, self.page_timeout).await
    }

    async fn scroll_height(&mut self) -> Result<u64, BrowserError> {
        // JS numbers arrive as floats
        let height: f64 = self.evaluate(SCROLL_HEIGHT_SCRIPT.to_string()).await?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.current_page()?
            .evaluate_expression(SCROLL_TO_BOTTOM_SCRIPT)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(())
    }

    async fn find_elements(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<ElementSnapshot>, BrowserError> {
        let script = snapshot_script(locator)?;
        let html: Vec<String> = self.evaluate(script).await.map_err(|e| BrowserError::Lookup {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;
        Ok(html.into_iter().map(ElementSnapshot::new).collect())
    }

    async fn click_all(&mut self, locator: &Locator) -> Result<usize, BrowserError> {
        let page = self.current_page()?;
        let lookup = match locator {
            Locator::Css(selector) => page.find_elements(selector.as_str()).await,
            Locator::XPath(expression) => page.find_xpaths(expression.as_str()).await,
        };
        let elements = lookup.map_err(|e| BrowserError::Lookup {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;

        let mut clicked = 0;
        for element in &elements {
            match element.click().await {
                Ok(_) => clicked += 1,
                Err(e) => debug!(locator = %locator, error = %e, "Element not clickable"),
            }
        }
        Ok(clicked)
    }

    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("browser already shut down".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(format!("failed to open page: {e}")))?;

        if let Err(e) = Self::goto(&page, url, self.page_timeout).await {
            if let Err(close_err) = page.close().await {
                warn!("Failed to close page: {close_err}");
            }
            return Err(e);
        }

        let handle = ContextHandle(self.next_handle);
        self.next_handle += 1;
        self.pages.insert(handle, page);
        self.current = handle;
        debug!(url = %url, context = %handle, "Opened browsing context");
        Ok(handle)
    }

    async fn switch_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        self.pages
            .get(handle)?
            .bring_to_front()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        self.current = handle;
        Ok(())
    }

    async fn close_context(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        self.pages.close_with(handle, Page::close).await
    }

    fn root_context(&self) -> ContextHandle {
        self.root
    }

    fn open_context_count(&self) -> usize {
        self.pages.len()
    }

    async fn shutdown(&mut self) {
        self.pages.clear();
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {e}");
            } else if let Err(e) = browser.wait().await {
                warn!("Browser process did not exit cleanly: {e}");
            } else {
                info!("Browser shutdown complete");
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
