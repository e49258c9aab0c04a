//! yt-dlp-backed downloader.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::process::{run_tool, stream_output, OutputStream, StreamEnd};
use super::{Downloader, ToolError, ToolResult};

const TOOL: &str = "yt-dlp";

static DOWNLOAD_PERCENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").ok());

/// Percentage from a `[download]  42.3% of ...` progress line.
pub fn parse_download_percent(line: &str) -> Option<f64> {
    let re = DOWNLOAD_PERCENT.as_ref()?;
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Downloader that shells out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: String,
}

impl YtDlpDownloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// The finished file `<dir>/<file_stem>.<ext>`, ignoring partial downloads.
fn find_downloaded(dir: &Path, file_stem: &str) -> ToolResult<Option<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ToolError::io("listing download directory", e))?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.file_stem().and_then(|s| s.to_str()) == Some(file_stem)
                && !matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("part") | Some("ytdl")
                )
        })
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}

impl Downloader for YtDlpDownloader {
    fn probe_title(&self, url: &Url) -> ToolResult<String> {
        let args = vec![
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--print".to_string(),
            "title".to_string(),
            url.to_string(),
        ];
        let output = run_tool(TOOL, &self.program, &args)
            .map_err(|e| e.with_message("Could not read the media title."))?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn download(
        &self,
        url: &Url,
        selector: &str,
        dest_dir: &Path,
        file_stem: &str,
        on_progress: &mut dyn FnMut(f64) -> ControlFlow<()>,
    ) -> ToolResult<PathBuf> {
        let template = dest_dir.join(format!("{}.%(ext)s", file_stem));
        let args = vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "-f".to_string(),
            selector.to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ];

        let end = stream_output(TOOL, &self.program, &args, OutputStream::Stdout, &mut |line| {
            match parse_download_percent(line) {
                Some(pct) => on_progress(pct),
                None => ControlFlow::Continue(()),
            }
        })?;

        match end {
            StreamEnd::Stopped => return Err(ToolError::interrupted(TOOL)),
            StreamEnd::Exited {
                success: false,
                code,
                tail,
                other,
            } => {
                let detail = if other.trim().is_empty() {
                    tail.join("\n")
                } else {
                    other.trim().to_string()
                };
                return Err(ToolError::failed(
                    TOOL,
                    format!("Download failed for format '{}'.", selector),
                    detail,
                    code,
                ));
            }
            StreamEnd::Exited { .. } => {}
        }

        find_downloaded(dest_dir, file_stem)?.ok_or_else(|| {
            ToolError::failed(
                TOOL,
                format!("Downloaded file '{}.*' was not found.", file_stem),
                "",
                None,
            )
        })
    }
}
