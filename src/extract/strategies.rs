//! Ordered lookup strategies for each field of a post.
//!
//! The markup shifts with viewport and experiment buckets, so every field
//! has a list of strategies tried in order until one yields a value. Each
//! strategy is a pure function over the parsed post; a miss is `None`,
//! never an error.

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::engagement::{looks_like_count, parse_count};
use crate::record::Metrics;

/// A single way of resolving a field from a post.
pub type Strategy<T> = fn(&ElementRef<'_>) -> Option<T>;

/// Run `strategies` in order and return the first hit.
pub fn first_match<T>(post: &ElementRef<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(post))
}

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: std::sync::LazyLock<Selector> =
            std::sync::LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(AUTHOR_CONTAINER_LINK, r#"div[data-testid="User-Name"] a"#);
selector!(AUTHOR_DIRECT_LINK, r#"a[data-testid="User-Name"]"#);
selector!(TEXT_CONTAINER, r#"div[data-testid="tweetText"]"#);
selector!(TIME_ELEMENT, "time");
selector!(STATUS_LINK, r#"a[href*="/status/"]"#);
selector!(SOCIAL_CONTEXT, r#"div[data-testid="socialContext"]"#);
selector!(
    GROUPED_METRICS,
    r#"[data-testid="reply"], [data-testid="retweet"], [data-testid="like"]"#
);
selector!(REPLY_COUNT_SPANS, r#"div[data-testid="reply"] span[class*="css-"]"#);
selector!(SHARE_COUNT_SPANS, r#"div[data-testid="retweet"] span[class*="css-"]"#);
selector!(LIKE_COUNT_SPANS, r#"div[data-testid="like"] span[class*="css-"]"#);

/// Permalink path segment carrying the post id.
static STATUS_ID_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"/status/(\d+)").unwrap());

/// Marker text of a post rendered as a reply in the feed.
const REPLY_MARKER: &str = "Replying to";

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Last non-empty path segment of an author link.
fn handle_from_href(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
}

fn author_from_container(post: &ElementRef<'_>) -> Option<String> {
    post.select(&AUTHOR_CONTAINER_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(handle_from_href)
}

fn author_from_direct_link(post: &ElementRef<'_>) -> Option<String> {
    post.select(&AUTHOR_DIRECT_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(handle_from_href)
}

/// Author strategies, most specific first.
pub const AUTHOR_STRATEGIES: &[Strategy<String>] =
    &[author_from_container, author_from_direct_link];

/// Post body text, if the text container is present.
pub fn text(post: &ElementRef<'_>) -> Option<String> {
    post.select(&TEXT_CONTAINER).next().map(|el| text_of(&el))
}

/// Machine-readable timestamp from the first `<time datetime>`.
pub fn timestamp(post: &ElementRef<'_>) -> Option<String> {
    post.select(&TIME_ELEMENT)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Raw href of the first status link.
pub fn status_href(post: &ElementRef<'_>) -> Option<String> {
    post.select(&STATUS_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(ToString::to_string)
}

/// Post id captured from a permalink.
#[must_use]
pub fn id_from_permalink(href: &str) -> Option<String> {
    STATUS_ID_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether the post carries a "Replying to" social-context marker.
pub fn is_reply(post: &ElementRef<'_>) -> bool {
    post.select(&SOCIAL_CONTEXT)
        .any(|el| text_of(&el).contains(REPLY_MARKER))
}

/// All three metrics from the grouped action-bar selector.
///
/// Later matches for the same metric overwrite earlier ones; empty labels
/// leave the metric untouched.
fn grouped_metrics(post: &ElementRef<'_>) -> Option<Metrics> {
    let mut metrics = Metrics::default();
    for element in post.select(&GROUPED_METRICS) {
        let label = text_of(&element);
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        let count = parse_count(label);
        match element.value().attr("data-testid") {
            Some("reply") => metrics.replies = count,
            Some("retweet") => metrics.shares = count,
            Some("like") => metrics.likes = count,
            _ => {}
        }
    }
    (!metrics.is_zero()).then_some(metrics)
}

/// First count-looking span under one metric's container.
fn span_count(post: &ElementRef<'_>, spans: &Selector) -> u64 {
    post.select(spans)
        .map(|span| text_of(&span).trim().to_string())
        .find(|label| looks_like_count(label))
        .map_or(0, |label| parse_count(&label))
}

/// Per-metric fallback over the nested count spans.
fn per_metric_spans(post: &ElementRef<'_>) -> Option<Metrics> {
    let metrics = Metrics {
        likes: span_count(post, &LIKE_COUNT_SPANS),
        shares: span_count(post, &SHARE_COUNT_SPANS),
        replies: span_count(post, &REPLY_COUNT_SPANS),
    };
    (!metrics.is_zero()).then_some(metrics)
}

/// Metric strategies. A strategy that finds only zeros counts as a miss, so
/// the next markup variant gets a chance.
pub const METRIC_STRATEGIES: &[Strategy<Metrics>] = &[grouped_metrics, per_metric_spans];
