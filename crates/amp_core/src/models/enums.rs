//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// One of the four stems produced by source separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    /// All stems in separation output order.
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    /// File stem used by the separation tool (`vocals.wav`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Other => "other",
        }
    }

    /// Parse a stem name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Stem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the pipeline produces at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportMode {
    /// Remixed audio muxed back onto the video stream.
    #[default]
    #[serde(rename = "Video")]
    Video,
    /// Remixed audio only.
    #[serde(rename = "Audio Only")]
    AudioOnly,
    /// Selected stems as individual files.
    #[serde(rename = "Stems Only")]
    StemsOnly,
}

impl ExportMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::AudioOnly => "Audio Only",
            Self::StemsOnly => "Stems Only",
        }
    }

    /// Get all available modes.
    pub fn all() -> &'static [ExportMode] {
        &[Self::Video, Self::AudioOnly, Self::StemsOnly]
    }

    /// Whether transcription and subtitle burning make sense for this mode.
    pub fn wants_subtitles(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl std::fmt::Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Audio container/codec for audio and stem exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
}

impl ExportFormat {
    /// File extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    /// FFmpeg encoder for this format.
    pub fn codec(&self) -> &'static str {
        format_to_codec(self.extension())
    }

    /// Parse a format name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Map an export format name to its FFmpeg encoder.
///
/// Unknown names fall back to the lossy default (`libmp3lame`).
pub fn format_to_codec(format_name: &str) -> &'static str {
    match format_name.trim().to_ascii_lowercase().as_str() {
        "mp3" => "libmp3lame",
        "wav" => "pcm_s16le",
        "flac" => "flac",
        _ => "libmp3lame",
    }
}

/// Transcription model size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhisperModel {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[default]
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl WhisperModel {
    /// Model name as understood by the transcription tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::LargeV3 => "large-v3",
        }
    }

    /// Get all available models.
    pub fn all() -> &'static [WhisperModel] {
        &[
            Self::Tiny,
            Self::Base,
            Self::Small,
            Self::Medium,
            Self::LargeV3,
        ]
    }

    /// Parse a model name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compute device handed to the ML tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Accelerated compute.
    Cuda,
    /// General-purpose compute.
    Cpu,
}

impl Device {
    /// Device name as passed on tool command lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }

    /// Whether half-precision inference should be requested.
    pub fn is_accelerated(&self) -> bool {
        matches!(self, Self::Cuda)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device preference from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use CUDA when available, CPU otherwise.
    #[default]
    Auto,
    Cuda,
    Cpu,
}
