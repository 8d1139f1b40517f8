//! CSV export and run summary.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::constants::MISSING_FIELD_TOKEN;
use crate::record::PostRecord;

/// Column names, in output order.
pub const CSV_COLUMNS: [&str; 10] = [
    "id",
    "speaker_nm",
    "conversation_id",
    "reply_to_id",
    "reply_to_nm",
    "timestamp",
    "text",
    "likes",
    "shares",
    "num_comments",
];

/// One CSV row. Field order is column order.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    speaker_nm: &'a str,
    conversation_id: &'a str,
    reply_to_id: &'a str,
    reply_to_nm: &'a str,
    timestamp: &'a str,
    text: &'a str,
    likes: u64,
    shares: u64,
    num_comments: u64,
}

impl<'a> From<&'a PostRecord> for CsvRow<'a> {
    fn from(record: &'a PostRecord) -> Self {
        Self {
            id: &record.id,
            speaker_nm: &record.author_handle,
            conversation_id: &record.conversation_id,
            reply_to_id: record.reply_to_id.as_deref().unwrap_or(MISSING_FIELD_TOKEN),
            reply_to_nm: record
                .reply_to_author
                .as_deref()
                .unwrap_or(MISSING_FIELD_TOKEN),
            timestamp: &record.timestamp,
            text: &record.text,
            likes: record.like_count,
            shares: record.share_count,
            num_comments: record.reply_count,
        }
    }
}

/// Write `records` as CSV to any writer, header first.
///
/// The header is written even when there are no records.
///
/// # Errors
///
/// Returns an error if serialization or the underlying write fails.
pub fn write_records<W: std::io::Write>(writer: W, records: &[PostRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(CSV_COLUMNS)
        .context("Failed to write CSV header")?;
    for record in records {
        csv_writer
            .serialize(CsvRow::from(record))
            .with_context(|| format!("Failed to write record {}", record.id))?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write `records` to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_csv(path: &Path, records: &[PostRecord]) -> Result<()> {
    info!(path = %path.display(), "Saving data");
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(std::io::BufWriter::new(file), records)?;
    info!(path = %path.display(), records = records.len(), "Saved records");
    Ok(())
}

/// Aggregate figures over an assembled record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub unique_conversations: usize,
    pub roots: usize,
    pub replies: usize,
    pub average_likes: f64,
    pub average_shares: f64,
    pub average_comments: f64,
}

impl Summary {
    #[must_use]
    pub fn from_records(records: &[PostRecord]) -> Self {
        let total = records.len();
        let unique_conversations = records
            .iter()
            .map(|r| r.conversation_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let roots = records.iter().filter(|r| r.is_root()).count();

        let mean = |f: fn(&PostRecord) -> u64| {
            if total == 0 {
                0.0
            } else {
                records.iter().map(f).sum::<u64>() as f64 / total as f64
            }
        };

        Self {
            total,
            unique_conversations,
            roots,
            replies: total - roots,
            average_likes: mean(|r| r.like_count),
            average_shares: mean(|r| r.share_count),
            average_comments: mean(|r| r.reply_count),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data Summary:")?;
        writeln!(f, "Total posts: {}", self.total)?;
        writeln!(f, "Unique conversations: {}", self.unique_conversations)?;
        writeln!(f, "Top-level posts: {}", self.roots)?;
        writeln!(f, "Replies: {}", self.replies)?;
        writeln!(f, "Average likes: {:.2}", self.average_likes)?;
        writeln!(f, "Average shares: {:.2}", self.average_shares)?;
        write!(f, "Average comments: {:.2}", self.average_comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Metrics, ThreadRoot};

    fn sample() -> Vec<PostRecord> {
        let root = PostRecord::root(
            "10".to_string(),
            "alice".to_string(),
            "2024-01-01T00:00:00.000Z".to_string(),
            "hello, \"world\"".to_string(),
            Metrics {
                likes: 4,
                shares: 2,
                replies: 1,
            },
        );
        let thread = ThreadRoot {
            permalink: "https://x.com/alice/status/10".to_string(),
            id: "10".to_string(),
            author: "alice".to_string(),
        };
        let reply = PostRecord::reply(
            &thread,
            "11".to_string(),
            "bob".to_string(),
            "2024-01-01T00:05:00.000Z".to_string(),
            "hi".to_string(),
            Metrics::default(),
        );
        vec![root, reply]
    }

    #[test]
    fn test_csv_layout() {
        let mut out = Vec::new();
        write_records(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "id,speaker_nm,conversation_id,reply_to_id,reply_to_nm,timestamp,text,likes,shares,num_comments"
        );
        assert_eq!(
            lines[1],
            r#"10,alice,10,None,None,2024-01-01T00:00:00.000Z,"hello, ""world""",4,2,1"#
        );
        assert_eq!(lines[2], "11,bob,10,10,alice,2024-01-01T00:05:00.000Z,hi,0,0,0");
    }

    #[test]
    fn test_empty_export_has_header() {
        let mut out = Vec::new();
        write_records(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &sample()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_COLUMNS.to_vec());
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn test_summary() {
        let summary = Summary::from_records(&sample());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.unique_conversations, 1);
        assert_eq!(summary.roots, 1);
        assert_eq!(summary.replies, 1);
        assert!((summary.average_likes - 2.0).abs() < f64::EPSILON);
        assert!((summary.average_shares - 1.0).abs() < f64::EPSILON);
        assert!((summary.average_comments - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_records(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.average_likes.abs() < f64::EPSILON);
        assert!(summary.to_string().contains("Total posts: 0"));
    }
}
