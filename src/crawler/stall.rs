//! Termination heuristic for infinitely scrolling pages.

/// Counts consecutive scrolls that did not change the page height.
#[derive(Debug, Clone)]
pub struct StallCounter {
    last_height: u64,
    stalls: u32,
    threshold: u32,
}

impl StallCounter {
    /// Start from an initial height reading.
    #[must_use]
    pub fn new(initial_height: u64, threshold: u32) -> Self {
        Self {
            last_height: initial_height,
            stalls: 0,
            threshold,
        }
    }

    /// Record the height after a scroll. Returns true if the page grew.
    pub fn observe(&mut self, height: u64) -> bool {
        let grew = height != self.last_height;
        if grew {
            self.stalls = 0;
        } else {
            self.stalls += 1;
        }
        self.last_height = height;
        grew
    }

    /// Count a scroll attempt that failed outright.
    pub fn record_failure(&mut self) {
        self.stalls += 1;
    }

    #[must_use]
    pub fn stalls(&self) -> u32 {
        self.stalls
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.stalls >= self.threshold
    }
}
