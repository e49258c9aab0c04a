//! Progress events emitted by the pipeline.

use serde::{Deserialize, Serialize};

/// A single progress update: a message plus a percentage.
///
/// `percent` in `0..=100` is determinate progress. A negative value means
/// the current work is long-running with no sub-progress available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    pub percent: f64,
}

impl ProgressEvent {
    /// Sentinel for indeterminate progress.
    pub const INDETERMINATE: f64 = -1.0;

    /// Determinate event, clamped to `0..=100`.
    pub fn new(message: impl Into<String>, percent: f64) -> Self {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        Self {
            message: message.into(),
            percent,
        }
    }

    /// Indeterminate event.
    pub fn busy(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: Self::INDETERMINATE,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.percent < 0.0
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_indeterminate() {
            write!(f, "[BUSY] {}", self.message)
        } else {
            write!(f, "[{}%] {}", self.percent as u32, self.message)
        }
    }
}
