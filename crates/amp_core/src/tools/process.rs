//! Subprocess execution helpers.
//!
//! [`run_tool`] runs a command to completion and captures its output.
//! [`stream_output`] spawns a long-running tool, hands every line of one
//! output stream to a callback while the tool runs, and kills the child
//! if the callback asks to stop.

use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::process::{Command, Output, Stdio};
use std::thread;

use super::{ToolError, ToolResult};

/// Lines of output kept for error reporting.
pub const TAIL_LINES: usize = 50;

/// Resolve `program`, failing early if it cannot be found.
fn locate(tool: &str, program: &str) -> ToolResult<()> {
    which::which(program).map(|_| ()).map_err(|_| ToolError::Missing {
        tool: tool.to_string(),
        program: program.to_string(),
    })
}

/// Run a command to completion.
///
/// A non-zero exit becomes [`ToolError::Failed`] with stderr as detail.
pub fn run_tool(tool: &str, program: &str, args: &[String]) -> ToolResult<Output> {
    locate(tool, program)?;

    tracing::debug!("Running {}: {} {}", tool, program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    if output.status.success() {
        return Ok(output);
    }

    let code = output.status.code();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    tracing::debug!("{} exited with {:?}", tool, code);

    Err(ToolError::failed(
        tool,
        format!("{} exited with code {}", tool, code.unwrap_or(-1)),
        stderr,
        code,
    ))
}

/// Which output stream [`stream_output`] reports line by line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// How a streamed process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The process exited on its own.
    Exited {
        success: bool,
        code: Option<i32>,
        /// Last [`TAIL_LINES`] lines of the watched stream.
        tail: Vec<String>,
        /// Full text of the other stream.
        other: String,
    },
    /// The callback returned `Break` and the process was killed.
    Stopped,
}

/// Spawn a command and feed each line of `stream` to `on_line`.
///
/// Lines are split on `\n` and on `\r`, since progress bars redraw in
/// place with carriage returns. Blank lines are skipped. The other stream
/// is drained on a helper thread so the child never blocks on a full pipe.
pub fn stream_output(
    tool: &str,
    program: &str,
    args: &[String],
    stream: OutputStream,
    on_line: &mut dyn FnMut(&str) -> ControlFlow<()>,
) -> ToolResult<StreamEnd> {
    locate(tool, program)?;

    tracing::debug!("Streaming {}: {} {}", tool, program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (watched, drained): (Option<Box<dyn Read + Send>>, Option<Box<dyn Read + Send>>) =
        match stream {
            OutputStream::Stdout => (
                stdout.map(|s| Box::new(s) as Box<dyn Read + Send>),
                stderr.map(|s| Box::new(s) as Box<dyn Read + Send>),
            ),
            OutputStream::Stderr => (
                stderr.map(|s| Box::new(s) as Box<dyn Read + Send>),
                stdout.map(|s| Box::new(s) as Box<dyn Read + Send>),
            ),
        };

    let drain = drained.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let Some(watched) = watched else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ToolError::io(
            format!("capturing {} output", tool),
            std::io::Error::other("output pipe unavailable"),
        ));
    };

    let mut reader = BufReader::new(watched);
    let mut splitter = LineSplitter::new();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
    let mut buf = [0u8; 4096];
    let mut stopped = false;

    'read: loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::io(format!("reading {} output", tool), e));
            }
        };

        for line in splitter.push(&buf[..n]) {
            push_tail(&mut tail, &line);
            if on_line(&line).is_break() {
                stopped = true;
                break 'read;
            }
        }
    }

    if stopped {
        tracing::debug!("Stopping {} at caller request", tool);
        let _ = child.kill();
        let _ = child.wait();
        return Ok(StreamEnd::Stopped);
    }

    if let Some(line) = splitter.finish() {
        push_tail(&mut tail, &line);
        if on_line(&line).is_break() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(StreamEnd::Stopped);
        }
    }

    let status = child
        .wait()
        .map_err(|e| ToolError::io(format!("waiting for {}", tool), e))?;

    let other = drain
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();

    tracing::debug!("{} exited with {:?}", tool, status.code());

    Ok(StreamEnd::Exited {
        success: status.success(),
        code: status.code(),
        tail: tail.into_iter().collect(),
        other,
    })
}

fn push_tail(tail: &mut VecDeque<String>, line: &str) {
    if tail.len() >= TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}

/// Incremental splitter for byte streams using `\n` or `\r` terminators.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; returns every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' || b == b'\r' {
                self.flush_into(&mut lines);
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Final unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.flush_into(&mut lines);
        lines.pop()
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_carriage_returns() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b" 10%|#   | 1/10\r 20%|##  | 2/10\rdone\n");
        assert_eq!(lines, vec![" 10%|#   | 1/10", " 20%|##  | 2/10", "done"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn joins_lines_across_reads() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"Separated tra").is_empty());
        assert_eq!(splitter.push(b"cks\r\nnext"), vec!["Separated tracks"]);
        assert_eq!(splitter.finish().as_deref(), Some("next"));
    }

    #[test]
    fn skips_blank_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"\n\r\n   \nx\n"), vec!["x"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"caf\xff\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("caf"));
    }

    #[test]
    fn missing_program_is_reported() {
        let err = run_tool("probe", "definitely-not-a-real-binary-xyz", &[]).unwrap_err();
        assert!(matches!(err, ToolError::Missing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn streams_lines_and_reports_exit() {
        let mut seen = Vec::new();
        let end = stream_output(
            "sh",
            "sh",
            &["-c".to_string(), "printf 'a\\rb\\nc\\n' 1>&2; exit 3".to_string()],
            OutputStream::Stderr,
            &mut |line| {
                seen.push(line.to_string());
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(seen, vec!["a", "b", "c"]);
        match end {
            StreamEnd::Exited {
                success, code, tail, ..
            } => {
                assert!(!success);
                assert_eq!(code, Some(3));
                assert_eq!(tail, vec!["a", "b", "c"]);
            }
            StreamEnd::Stopped => panic!("process should have exited"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn break_kills_child() {
        let end = stream_output(
            "sh",
            "sh",
            &[
                "-c".to_string(),
                "echo first 1>&2; sleep 30; echo second 1>&2".to_string(),
            ],
            OutputStream::Stderr,
            &mut |_| ControlFlow::Break(()),
        )
        .unwrap();

        assert_eq!(end, StreamEnd::Stopped);
    }
}
