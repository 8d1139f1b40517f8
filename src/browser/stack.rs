//! Push/pop discipline for nested browsing contexts.

use tracing::{debug, warn};

use super::{BrowserError, BrowserSession, ContextHandle};

/// Maximum nesting: the root feed plus one open thread.
pub const MAX_CONTEXT_DEPTH: usize = 2;

/// Stack of open browsing contexts, root at the bottom.
///
/// Every `push` must be matched by a `pop` on all paths. `pop` always
/// releases the top context and refocuses the one below it, even if closing
/// fails, so a failed thread visit cannot leave a stray tab behind.
#[derive(Debug)]
pub struct ContextStack {
    handles: Vec<ContextHandle>,
    max_depth: usize,
}

impl ContextStack {
    /// Start a stack whose bottom is `root`.
    #[must_use]
    pub fn new(root: ContextHandle) -> Self {
        Self {
            handles: vec![root],
            max_depth: MAX_CONTEXT_DEPTH,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.handles.len()
    }

    /// Handle of the context currently on top.
    #[must_use]
    pub fn current(&self) -> ContextHandle {
        // The root is never popped, so the stack is never empty.
        self.handles[self.handles.len() - 1]
    }

    /// Open a context at `url` and push it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack is full or the provider cannot open the
    /// context. Nothing is pushed in either case.
    pub async fn push<S>(
        &mut self,
        session: &mut S,
        url: &str,
    ) -> Result<ContextHandle, BrowserError>
    where
        S: BrowserSession + ?Sized,
    {
        if self.handles.len() >= self.max_depth {
            return Err(BrowserError::StackFull(self.handles.len()));
        }

        let handle = session.open_context(url).await?;
        self.handles.push(handle);
        debug!(context = %handle, depth = self.depth(), "Pushed browsing context");
        Ok(handle)
    }

    /// Close the top context and refocus the one beneath it.
    ///
    /// The root context is never popped. Both the close and the switch are
    /// attempted regardless of each other's outcome; the first error is
    /// returned after the handle has been removed from the stack.
    ///
    /// # Errors
    ///
    /// Returns the first provider error encountered.
    pub async fn pop<S>(&mut self, session: &mut S) -> Result<(), BrowserError>
    where
        S: BrowserSession + ?Sized,
    {
        if self.handles.len() <= 1 {
            return Ok(());
        }

        let Some(top) = self.handles.pop() else {
            return Ok(());
        };
        let below = self.current();

        let closed = session.close_context(top).await;
        if let Err(ref e) = closed {
            warn!(context = %top, error = %e, "Failed to close browsing context");
        }

        let switched = session.switch_context(below).await;
        if let Err(ref e) = switched {
            warn!(context = %below, error = %e, "Failed to refocus browsing context");
        }

        debug!(closed = %top, current = %below, depth = self.depth(), "Popped browsing context");
        closed.and(switched)
    }
}
