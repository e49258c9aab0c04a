//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Writes to a dedicated log file
//! - Forwards every line to a callback (the queue turns these into events)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-job logger with dual output (file + callback).
pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl JobLogger {
    /// Create a new job logger writing `<log_dir>/<job_name>.log`.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            job_name,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        })
    }

    /// Get the job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress update, filtered to step boundaries in compact mode.
    ///
    /// Returns true if the line was written.
    pub fn progress(&self, percent: u32, message: &str) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            if let Some(prev) = *last {
                let crossed = percent / step != prev / step;
                if !crossed && percent < 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("[{:>3}%] {}", percent, message));
        true
    }

    /// Record a line of tool output.
    ///
    /// Always kept in the tail buffer; written out only in verbose mode.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 && buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            if self.config.error_tail > 0 {
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        self.log(LogLevel::Debug, line);
    }

    /// Write the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let lines: Vec<String> = self.tail_buffer.lock().iter().cloned().collect();
        if lines.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in &lines {
            self.output(&self.format_message(line));
        }
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for JobLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLogger")
            .field("job_name", &self.job_name)
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

/// Make a string safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn quiet_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().ends_with("job-1.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), quiet_config(), None).unwrap();

        logger.phase("Separate");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Separate ==="));
    }

    #[test]
    fn calls_callback() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::new("job-1", dir.path(), quiet_config(), Some(callback)).unwrap();
        logger.info("one");
        logger.warn("two");
        logger.debug("filtered by level");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..quiet_config()
        };
        let logger = JobLogger::new("job-1", dir.path(), config, None).unwrap();

        assert!(logger.progress(0, "start"));
        assert!(!logger.progress(5, "x"));
        assert!(!logger.progress(15, "x"));
        assert!(logger.progress(20, "x"));
        assert!(!logger.progress(25, "x"));
        assert!(logger.progress(40, "x"));
        assert!(logger.progress(100, "done"));
        assert!(logger.progress(100, "cleanup"));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 5,
            ..quiet_config()
        };
        let logger = JobLogger::new("job-1", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i));
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("AC/DC: Live"), "AC_DC_ Live");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
