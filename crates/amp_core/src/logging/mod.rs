//! Logging infrastructure for the media processor.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use amp_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("my_song", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Separate");
//! logger.command("python3 -m demucs -n htdemucs ...");
//! logger.progress(50, "AI Separation (Chunk 1/2) - 100%");
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name for the application log written by `init_tracing_with_file`.
pub const APP_LOG_FILE: &str = "amp.log";

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr with timestamps
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(env_filter(default_level))
        .init();
}

/// Like [`init_tracing`], additionally writing to `<log_dir>/amp.log`.
///
/// The returned guard flushes the background writer when dropped; keep it
/// alive for the lifetime of the program.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: impl AsRef<Path>,
) -> std::io::Result<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;

    let appender = tracing_appender::rolling::never(log_dir, APP_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter(default_level))
        .init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
    }

    #[test]
    fn test_tracing_can_be_initialized_twice() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("visible in test output");
    }
}
