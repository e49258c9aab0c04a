//! Maps separation tool diagnostics onto overall job progress.
//!
//! The separator prints one tqdm bar per chunk to stderr. Each bar climbs
//! to 100% and the next one starts again near 0, so a drop in percentage
//! after a value above 95 marks a finished chunk.

use std::sync::LazyLock;

use regex::Regex;

/// Overall percentage where separation starts.
pub const SEPARATION_START: f64 = 30.0;
/// Overall percentage where separation ends.
pub const SEPARATION_END: f64 = 70.0;

/// Above this a falling percentage counts as a chunk rollover.
const ROLLOVER_THRESHOLD: u32 = 95;

static BAR_PERCENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+)%\|").ok());

/// Percentage of a tqdm progress bar line (`  42%|████  | ...`).
pub fn parse_percentage(line: &str) -> Option<u32> {
    let re = BAR_PERCENT.as_ref()?;
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

/// One progress update derived from a diagnostic line.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationTick {
    /// Overall job percentage (30..=70).
    pub percent: f64,
    pub message: String,
}

/// Chunk-aware progress state for one separation run.
#[derive(Debug, Clone)]
pub struct SeparationProgress {
    total_chunks: usize,
    completed: usize,
    last_percent: u32,
}

impl SeparationProgress {
    pub fn new(total_chunks: usize) -> Self {
        Self {
            total_chunks: total_chunks.max(1),
            completed: 0,
            last_percent: 0,
        }
    }

    /// Chunks known to be finished.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Feed one line; returns an update when the line carries a percentage.
    pub fn observe(&mut self, line: &str) -> Option<SeparationTick> {
        let pct = parse_percentage(line)?;

        if pct < self.last_percent && self.last_percent > ROLLOVER_THRESHOLD {
            self.completed = (self.completed + 1).min(self.total_chunks);
        }
        self.last_percent = pct;

        let total = self.total_chunks as f64;
        let fraction = (self.completed as f64 + f64::from(pct) / 100.0) / total;
        let percent = (SEPARATION_START + fraction * (SEPARATION_END - SEPARATION_START))
            .min(SEPARATION_END);

        let current = (self.completed + 1).min(self.total_chunks);
        Some(SeparationTick {
            percent,
            message: format!(
                "AI Separation (Chunk {}/{}) - {}%",
                current, self.total_chunks, pct
            ),
        })
    }
}
