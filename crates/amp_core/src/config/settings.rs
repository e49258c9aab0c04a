//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{
    DevicePreference, ExportFormat, ExportMode, JobParams, KaraokeStyle, SourceLocator,
    StemSelection, StemVolumes, WhisperModel,
};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Chunking, canonical audio format and compute device.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Queue admission rules.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Defaults for new jobs.
    #[serde(default)]
    pub defaults: JobDefaults,
}

/// Path configuration for output, scratch and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Output folder used when a job does not name one.
    #[serde(default = "default_output")]
    pub default_output: String,

    /// Parent for per-run scratch directories. Empty means the job's
    /// output folder.
    #[serde(default)]
    pub temp_root: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_output() -> String {
    "output".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
            default_output: default_output(),
            temp_root: String::new(),
        }
    }
}

impl PathSettings {
    /// Scratch parent for a job writing to `output_dir`.
    pub fn scratch_root(&self, output_dir: &std::path::Path) -> PathBuf {
        if self.temp_root.trim().is_empty() {
            output_dir.to_path_buf()
        } else {
            PathBuf::from(&self.temp_root)
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for job logs and the console.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show on error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Also write application logs to `<logs_folder>/amp.log`.
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            log_to_file: false,
        }
    }
}

/// Processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Length of each separation chunk in seconds.
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration_secs: f64,

    /// How long before the first word a lyric line appears.
    #[serde(default = "default_lead_in")]
    pub lyric_lead_in_secs: f64,

    /// Sample rate of the canonical audio track.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count of the canonical audio track.
    #[serde(default = "default_channels")]
    pub channels: u32,

    /// Compute device for separation and transcription.
    #[serde(default)]
    pub device: DevicePreference,
}

fn default_chunk_duration() -> f64 {
    300.0
}

fn default_lead_in() -> f64 {
    crate::subtitles::DEFAULT_LEAD_IN_SECS
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u32 {
    2
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            chunk_duration_secs: default_chunk_duration(),
            lyric_lead_in_secs: default_lead_in(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            device: DevicePreference::default(),
        }
    }
}

/// External tool locations. Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_yt_dlp")]
    pub yt_dlp: String,

    /// Interpreter used to run `-m demucs`.
    #[serde(default = "default_python")]
    pub python: String,

    /// Demucs model; also names its output subdirectory.
    #[serde(default = "default_demucs_model")]
    pub demucs_model: String,

    #[serde(default = "default_stable_ts")]
    pub stable_ts: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_yt_dlp() -> String {
    "yt-dlp".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_demucs_model() -> String {
    "htdemucs".to_string()
}

fn default_stable_ts() -> String {
    "stable-ts".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            yt_dlp: default_yt_dlp(),
            python: default_python(),
            demucs_model: default_demucs_model(),
            stable_ts: default_stable_ts(),
        }
    }
}

/// Queue admission configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Hosts accepted for remote sources in addition to the built-in list.
    #[serde(default)]
    pub extra_hosts: Vec<String>,
}

/// Job parameter defaults.
///
/// Scalar fields come first so the TOML tables serialize after them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefaults {
    #[serde(default)]
    pub pitch_semitones: i32,

    #[serde(default = "default_speed")]
    pub speed: f64,

    #[serde(default)]
    pub normalize: bool,

    #[serde(default)]
    pub generate_lyrics: bool,

    #[serde(default)]
    pub whisper_model: WhisperModel,

    #[serde(default)]
    pub export_mode: ExportMode,

    #[serde(default)]
    pub export_format: ExportFormat,

    #[serde(default)]
    pub stem_volumes: StemVolumes,

    #[serde(default)]
    pub stems_to_export: StemSelection,

    #[serde(default)]
    pub karaoke: KaraokeStyle,
}

fn default_speed() -> f64 {
    1.0
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            pitch_semitones: 0,
            speed: default_speed(),
            normalize: false,
            generate_lyrics: false,
            whisper_model: WhisperModel::default(),
            export_mode: ExportMode::default(),
            export_format: ExportFormat::default(),
            stem_volumes: StemVolumes::default(),
            stems_to_export: StemSelection::default(),
            karaoke: KaraokeStyle::default(),
        }
    }
}

impl JobDefaults {
    /// Build job parameters from these defaults.
    pub fn to_params(&self, source: SourceLocator, output_dir: impl Into<PathBuf>) -> JobParams {
        JobParams {
            source,
            output_dir: output_dir.into(),
            stem_volumes: self.stem_volumes,
            pitch_semitones: self.pitch_semitones,
            speed: self.speed,
            normalize: self.normalize,
            generate_lyrics: self.generate_lyrics,
            whisper_model: self.whisper_model,
            karaoke: self.karaoke.clone(),
            export_mode: self.export_mode,
            export_format: self.export_format,
            stems_to_export: self.stems_to_export,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Processing,
    Tools,
    Queue,
    Defaults,
}

impl ConfigSection {
    /// Every section in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Processing,
        ConfigSection::Tools,
        ConfigSection::Queue,
        ConfigSection::Defaults,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Processing => "processing",
            ConfigSection::Tools => "tools",
            ConfigSection::Queue => "queue",
            ConfigSection::Defaults => "defaults",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, scratch and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Processing => "Chunking, audio format and compute device",
            ConfigSection::Tools => "External tools (names are looked up on PATH)",
            ConfigSection::Queue => "Accepted hosts for online sources",
            ConfigSection::Defaults => "Defaults for new jobs",
        }
    }
}
