//! AMP Core - backend logic for the stem remix media processor
//!
//! This crate contains the pipeline, job queue, external tool adapters and
//! subtitle generation with zero UI dependencies. It is driven by the `amp`
//! command line tool.

pub mod config;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod subtitles;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
