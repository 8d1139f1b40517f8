//! Output record model.

/// Engagement counts attached to a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub likes: u64,
    pub shares: u64,
    pub replies: u64,
}

impl Metrics {
    /// True when every count is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.shares == 0 && self.replies == 0
    }
}

/// One collected post, root or reply.
///
/// Built only through [`PostRecord::root`] and [`PostRecord::reply`], so the
/// conversation linkage always matches the kind of post. Replies are
/// flattened: they point at the thread root, not at their immediate parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,
    pub author_handle: String,
    pub conversation_id: String,
    pub reply_to_id: Option<String>,
    pub reply_to_author: Option<String>,
    pub timestamp: String,
    pub text: String,
    pub like_count: u64,
    pub share_count: u64,
    pub reply_count: u64,
}

/// Identity of a thread root, as handed to the thread crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRoot {
    pub permalink: String,
    pub id: String,
    pub author: String,
}

impl PostRecord {
    /// Build a root record. Its conversation is itself.
    #[must_use]
    pub fn root(
        id: String,
        author_handle: String,
        timestamp: String,
        text: String,
        metrics: Metrics,
    ) -> Self {
        Self {
            conversation_id: id.clone(),
            id,
            author_handle,
            reply_to_id: None,
            reply_to_author: None,
            timestamp,
            text,
            like_count: metrics.likes,
            share_count: metrics.shares,
            reply_count: metrics.replies,
        }
    }

    /// Build a reply record attached directly to `root`.
    #[must_use]
    pub fn reply(
        root: &ThreadRoot,
        id: String,
        author_handle: String,
        timestamp: String,
        text: String,
        metrics: Metrics,
    ) -> Self {
        Self {
            id,
            author_handle,
            conversation_id: root.id.clone(),
            reply_to_id: Some(root.id.clone()),
            reply_to_author: Some(root.author.clone()),
            timestamp,
            text,
            like_count: metrics.likes,
            share_count: metrics.shares,
            reply_count: metrics.replies,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.reply_to_id.is_none()
    }
}
