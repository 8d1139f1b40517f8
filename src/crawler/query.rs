//! Search query construction.

use chrono::NaiveDate;
use url::Url;

/// Date format used by the search operators.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A topic search bounded by a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub topic: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
    /// Two-letter language code for the `lang:` operator, if restricted.
    pub language: Option<String>,
}

impl SearchQuery {
    /// Raw query text as typed into the search box.
    #[must_use]
    pub fn query_text(&self) -> String {
        let mut q = self.topic.trim().to_string();
        if let Some(ref lang) = self.language {
            q.push_str(&format!(" lang:{lang}"));
        }
        q.push_str(&format!(
            " until:{} since:{}",
            self.until.format(DATE_FORMAT),
            self.since.format(DATE_FORMAT)
        ));
        q
    }

    /// Full search URL under `base`, ranked by relevance ("top").
    ///
    /// # Errors
    ///
    /// Returns an error if `base` cannot be joined with the search path.
    pub fn to_url(&self, base: &Url) -> Result<String, url::ParseError> {
        let search = base.join("search")?;
        Ok(format!(
            "{search}?q={}&src=typed_query&f=top",
            urlencoding::encode(&self.query_text())
        ))
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns an error if `value` is not a valid calendar date in that format.
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}
