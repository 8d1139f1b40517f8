//! Terminal progress reporting.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over collected root posts against the post limit.
#[derive(Clone)]
pub struct CrawlProgress {
    bar: ProgressBar,
}

impl CrawlProgress {
    /// Visible bar with `target` steps.
    #[must_use]
    pub fn new(target: usize) -> Self {
        let bar = ProgressBar::new(target as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
                     {pos}/{len} posts ({msg})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Bar that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn root_collected(&self, total_records: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!("{total_records} records"));
    }

    pub fn replies_collected(&self, total_records: usize) {
        self.bar.set_message(format!("{total_records} records"));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for CrawlProgress {
    fn default() -> Self {
        Self::hidden()
    }
}
