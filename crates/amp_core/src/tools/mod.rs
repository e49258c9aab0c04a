//! External tool integration.
//!
//! The pipeline talks to four collaborators through traits so tests can
//! substitute recording stubs:
//!
//! - [`CodecEngine`] - decode, slice, mix, filter and encode (FFmpeg)
//! - [`Downloader`] - fetch remote media (yt-dlp)
//! - [`Transcriber`] - word-timed transcription (stable-ts)
//! - [`Separator`] - four-stem source separation (Demucs)
//!
//! [`Toolset`] bundles one implementation of each.

mod demucs;
mod device;
mod ffmpeg;
mod process;
mod whisper;
mod ytdlp;

use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::ToolSettings;
use crate::models::{Device, TranscriptionResult, WhisperModel};

pub use demucs::DemucsSeparator;
pub use device::{cuda_available, resolve_device};
pub use ffmpeg::{concat_list_contents, FfmpegEngine};
pub use process::{run_tool, stream_output, LineSplitter, OutputStream, StreamEnd, TAIL_LINES};
pub use whisper::StableTsTranscriber;
pub use ytdlp::{parse_download_percent, YtDlpDownloader};

/// Failure of an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The executable could not be located.
    #[error("{tool} was not found (looked for '{program}')")]
    Missing { tool: String, program: String },

    /// The process could not be started.
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and reported failure.
    #[error("{message}")]
    Failed {
        tool: String,
        message: String,
        /// Captured diagnostic output (usually stderr).
        detail: String,
        exit_code: Option<i32>,
    },

    /// The tool's output could not be understood.
    #[error("Failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    /// The caller stopped the tool before it finished.
    #[error("{tool} was stopped before completion")]
    Interrupted { tool: String },

    /// File I/O around a tool invocation.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
            detail: detail.into(),
            exit_code,
        }
    }

    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn interrupted(tool: impl Into<String>) -> Self {
        Self::Interrupted { tool: tool.into() }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Replace the message of a `Failed` error, keeping its detail.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            Self::Failed {
                tool,
                detail,
                exit_code,
                ..
            } => Self::Failed {
                tool,
                message: message.into(),
                detail,
                exit_code,
            },
            other => other,
        }
    }

    /// Name of the tool involved, if known.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::Missing { tool, .. }
            | Self::Spawn { tool, .. }
            | Self::Failed { tool, .. }
            | Self::Parse { tool, .. }
            | Self::Interrupted { tool } => Some(tool),
            Self::Io { .. } => None,
        }
    }

    /// Captured diagnostic output.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Failed { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Raw PCM audio layout for intermediate files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl AudioFormat {
    /// 16-bit PCM WAV with the given rate and channel count.
    pub fn pcm(sample_rate: u32, channels: u32) -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            sample_rate,
            channels,
        }
    }

    /// FFmpeg channel layout name.
    pub fn channel_layout(&self) -> String {
        match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{}c", n),
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::pcm(44_100, 2)
    }
}

/// One input to a volume-weighted mix.
#[derive(Debug, Clone, PartialEq)]
pub struct MixInput {
    pub path: PathBuf,
    pub volume: f64,
}

impl MixInput {
    pub fn new(path: impl Into<PathBuf>, volume: f64) -> Self {
        Self {
            path: path.into(),
            volume,
        }
    }
}

/// Audio effect applied to the master mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioFilter {
    /// EBU R128 loudness normalization.
    Loudnorm,
    /// Pitch shift by a frequency ratio, tempo preserved.
    Pitch { ratio: f64 },
    /// Tempo change, pitch preserved.
    Tempo { factor: f64 },
}

impl AudioFilter {
    /// Pitch shift expressed in semitones.
    pub fn pitch_semitones(semitones: i32) -> Self {
        Self::Pitch {
            ratio: pitch_ratio(semitones),
        }
    }

    /// FFmpeg filter expression.
    pub fn to_ffmpeg(&self) -> String {
        match self {
            Self::Loudnorm => "loudnorm".to_string(),
            Self::Pitch { ratio } => format!("rubberband=pitch={}", ratio),
            Self::Tempo { factor } => atempo_stages(*factor)
                .iter()
                .map(|f| format!("atempo={}", f))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Frequency ratio for a shift of `semitones` (12 semitones = one octave).
pub fn pitch_ratio(semitones: i32) -> f64 {
    2f64.powf(f64::from(semitones) / 12.0)
}

/// Split a tempo factor into `atempo` stages that each stay in `0.5..=2.0`.
///
/// The product of the stages equals `factor`. Non-positive or non-finite
/// factors yield a single neutral stage.
pub fn atempo_stages(factor: f64) -> Vec<f64> {
    if !factor.is_finite() || factor <= 0.0 {
        return vec![1.0];
    }

    let mut stages = Vec::new();
    let mut remaining = factor;
    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    stages.push(remaining);
    stages
}

/// Join filters into a comma-separated FFmpeg `-af` chain.
pub fn filter_chain(filters: &[AudioFilter]) -> String {
    filters
        .iter()
        .map(AudioFilter::to_ffmpeg)
        .collect::<Vec<_>>()
        .join(",")
}

/// Video filter applied while muxing.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoFilter {
    /// Retime frames to match an audio speed change.
    Speed(f64),
    /// Burn an ASS subtitle file into the picture.
    BurnSubtitles(PathBuf),
}

impl VideoFilter {
    /// FFmpeg filter expression.
    pub fn to_ffmpeg(&self) -> String {
        match self {
            Self::Speed(speed) => format!("setpts={}*PTS", 1.0 / speed),
            Self::BurnSubtitles(path) => format!("ass={}", escape_filter_path(path)),
        }
    }
}

/// Escape a path for use as a filter option value inside a `-vf` graph.
///
/// FFmpeg unescapes the value twice: once when splitting the graph and
/// once when parsing the filter's options.
fn escape_filter_path(path: &Path) -> String {
    let posix = path.to_string_lossy().replace('\\', "/");
    let option = escape_chars(&posix, &['\\', '\'', ':']);
    escape_chars(&option, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Final video assembly: picture from one file, audio from another.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxRequest {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
    pub video_filters: Vec<VideoFilter>,
    pub video_codec: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl MuxRequest {
    /// H.264/AAC request with no video filters.
    pub fn new(
        video: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video: video.into(),
            audio: audio.into(),
            output: output.into(),
            video_filters: Vec::new(),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "320k".to_string(),
        }
    }

    pub fn with_filter(mut self, filter: VideoFilter) -> Self {
        self.video_filters.push(filter);
        self
    }

    /// `-vf` argument, if any filter is set.
    pub fn video_filter_graph(&self) -> Option<String> {
        if self.video_filters.is_empty() {
            return None;
        }
        Some(
            self.video_filters
                .iter()
                .map(VideoFilter::to_ffmpeg)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

/// Audio/video codec engine.
pub trait CodecEngine: Send + Sync {
    /// Decode the audio track of `input` into `output` with `format`.
    fn extract_audio(&self, input: &Path, output: &Path, format: &AudioFormat) -> ToolResult<()>;

    /// Duration of a media file in seconds.
    fn probe_duration(&self, file: &Path) -> ToolResult<f64>;

    /// Copy `length` seconds starting at `start` into a PCM WAV file.
    fn slice(&self, input: &Path, start: f64, length: f64, output: &Path) -> ToolResult<()>;

    /// Mix inputs with per-input volume; output lasts as long as the longest.
    fn mix(&self, inputs: &[MixInput], output: &Path) -> ToolResult<()>;

    /// Write `seconds` of digital silence.
    fn silence(&self, seconds: f64, format: &AudioFormat, output: &Path) -> ToolResult<()>;

    /// Join files in order through a concat list written to `list_file`.
    fn concatenate(
        &self,
        inputs: &[PathBuf],
        list_file: &Path,
        output: &Path,
        codec: Option<&str>,
    ) -> ToolResult<()>;

    /// Render `input` through a filter chain.
    fn apply_filters(
        &self,
        input: &Path,
        filters: &[AudioFilter],
        output: &Path,
        codec: Option<&str>,
    ) -> ToolResult<()>;

    /// Combine a video stream with a new audio track.
    fn mux(&self, request: &MuxRequest) -> ToolResult<()>;
}

/// Remote media downloader.
pub trait Downloader: Send + Sync {
    /// Title of the media behind `url`.
    fn probe_title(&self, url: &Url) -> ToolResult<String>;

    /// Download the stream chosen by `selector` to `<dest_dir>/<file_stem>.<ext>`.
    ///
    /// `on_progress` receives percentages; returning `Break` stops the
    /// download with [`ToolError::Interrupted`].
    fn download(
        &self,
        url: &Url,
        selector: &str,
        dest_dir: &Path,
        file_stem: &str,
        on_progress: &mut dyn FnMut(f64) -> ControlFlow<()>,
    ) -> ToolResult<PathBuf>;
}

/// Speech-to-text with word timestamps.
pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        audio: &Path,
        model: WhisperModel,
        device: Device,
    ) -> ToolResult<TranscriptionResult>;
}

/// Four-stem source separation.
pub trait Separator: Send + Sync {
    /// Model name; also the subdirectory the tool writes under `out_dir`.
    fn model_name(&self) -> &str;

    /// Separate every input in one invocation.
    ///
    /// Stems land in `<out_dir>/<model>/<input stem>/<stem>.wav`. Each
    /// diagnostic line is passed to `on_line`; returning `Break` stops the
    /// tool with [`ToolError::Interrupted`].
    fn separate(
        &self,
        out_dir: &Path,
        device: Device,
        inputs: &[PathBuf],
        on_line: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> ToolResult<()>;
}

/// One implementation of each collaborator.
#[derive(Clone)]
pub struct Toolset {
    pub codec: Arc<dyn CodecEngine>,
    pub downloader: Arc<dyn Downloader>,
    pub transcriber: Arc<dyn Transcriber>,
    pub separator: Arc<dyn Separator>,
}

impl Toolset {
    /// Subprocess-backed tools configured from settings.
    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self {
            codec: Arc::new(FfmpegEngine::new(&tools.ffmpeg, &tools.ffprobe)),
            downloader: Arc::new(YtDlpDownloader::new(&tools.yt_dlp)),
            transcriber: Arc::new(StableTsTranscriber::new(&tools.stable_ts)),
            separator: Arc::new(DemucsSeparator::new(&tools.python, &tools.demucs_model)),
        }
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("separator_model", &self.separator.model_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octave_shifts_are_exact() {
        assert_eq!(pitch_ratio(12), 2.0);
        assert_eq!(pitch_ratio(-12), 0.5);
        assert_eq!(pitch_ratio(0), 1.0);
        assert!((pitch_ratio(1) - 1.059_463).abs() < 1e-6);
    }

    #[test]
    fn pitch_filter_uses_ratio() {
        assert_eq!(
            AudioFilter::pitch_semitones(12).to_ffmpeg(),
            "rubberband=pitch=2"
        );
    }

    #[test]
    fn atempo_in_range_is_single_stage() {
        assert_eq!(atempo_stages(1.5), vec![1.5]);
        assert_eq!(atempo_stages(0.5), vec![0.5]);
        assert_eq!(atempo_stages(2.0), vec![2.0]);
    }

    #[test]
    fn atempo_out_of_range_is_split() {
        let fast = atempo_stages(3.0);
        assert_eq!(fast, vec![2.0, 1.5]);

        let slow = atempo_stages(0.3);
        assert!(slow.iter().all(|f| (0.5..=2.0).contains(f)));
        let product: f64 = slow.iter().product();
        assert!((product - 0.3).abs() < 1e-9);
    }

    #[test]
    fn atempo_rejects_invalid_factor() {
        assert_eq!(atempo_stages(0.0), vec![1.0]);
        assert_eq!(atempo_stages(f64::NAN), vec![1.0]);
    }

    #[test]
    fn chain_keeps_order() {
        let chain = filter_chain(&[
            AudioFilter::Loudnorm,
            AudioFilter::Pitch { ratio: 0.5 },
            AudioFilter::Tempo { factor: 4.0 },
        ]);
        assert_eq!(chain, "loudnorm,rubberband=pitch=0.5,atempo=2,atempo=2");
    }

    #[test]
    fn video_filters_render() {
        let request = MuxRequest::new("v.mp4", "a.wav", "out.mp4")
            .with_filter(VideoFilter::Speed(2.0))
            .with_filter(VideoFilter::BurnSubtitles(PathBuf::from("C:\\tmp\\lyrics.ass")));
        assert_eq!(
            request.video_filter_graph().as_deref(),
            Some(r"setpts=0.5*PTS,ass=C\\:/tmp/lyrics.ass")
        );
        assert!(MuxRequest::new("v", "a", "o").video_filter_graph().is_none());
    }

    /// Reads one token the way FFmpeg's `av_get_token` does: backslash
    /// escapes the next char, single quotes are literal, `term` ends it.
    fn read_token(input: &str, term: &[char]) -> String {
        let mut out = String::new();
        let mut chars = input.chars();
        while let Some(c) = chars.next() {
            if term.contains(&c) {
                break;
            }
            match c {
                '\\' => out.extend(chars.next()),
                '\'' => {
                    for q in chars.by_ref() {
                        if q == '\'' {
                            break;
                        }
                        out.push(q);
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }

    fn parsed_subtitle_path(path: &str) -> String {
        let filter = VideoFilter::BurnSubtitles(PathBuf::from(path)).to_ffmpeg();
        let args = filter.strip_prefix("ass=").unwrap();
        let graph_value = read_token(args, &['[', ']', ',', ';']);
        read_token(&graph_value, &[':'])
    }

    #[test]
    fn subtitle_paths_survive_both_unescape_passes() {
        assert_eq!(
            VideoFilter::BurnSubtitles(PathBuf::from("/out/Don't Stop/lyrics.ass")).to_ffmpeg(),
            r"ass=/out/Don\\\'t Stop/lyrics.ass"
        );
        for path in [
            "/out/Don't Stop_temp_1_ab/lyrics.ass",
            "C:/tmp/lyrics.ass",
            "/out/[Live], Part 1; Take 2/lyrics.ass",
            "/out/it's 5:00/lyrics.ass",
        ] {
            assert_eq!(parsed_subtitle_path(path), path);
        }
    }

    #[test]
    fn failed_error_exposes_detail() {
        let err = ToolError::failed("demucs", "Demucs failed.", "CUDA out of memory", Some(1))
            .with_message("Separation failed.");
        assert_eq!(err.to_string(), "Separation failed.");
        assert_eq!(err.detail(), Some("CUDA out of memory"));
        assert_eq!(err.tool(), Some("demucs"));
    }

    #[test]
    fn channel_layouts() {
        assert_eq!(AudioFormat::pcm(44_100, 1).channel_layout(), "mono");
        assert_eq!(AudioFormat::default().channel_layout(), "stereo");
        assert_eq!(AudioFormat::pcm(48_000, 6).channel_layout(), "6c");
    }
}
