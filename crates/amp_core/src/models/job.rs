//! Job parameter types.
//!
//! A `JobParams` value is the full, immutable description of one pipeline
//! run. The queue stores a snapshot of it; nothing in the core mutates it
//! after submission.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use super::enums::{ExportFormat, ExportMode, Stem, WhisperModel};

/// Where the media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum SourceLocator {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An online video page handled by the downloader.
    Remote(Url),
}

impl SourceLocator {
    /// Interpret user input as a URL (http/https) or a local path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(trimmed)),
        }
    }

    /// Local path, if this is a local source.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(p) => Some(p),
            Self::Remote(_) => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(p) => write!(f, "{}", p.display()),
            Self::Remote(u) => write!(f, "{}", u),
        }
    }
}

/// Per-stem volume multipliers (1.0 = unity gain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StemVolumes {
    #[serde(default = "unity")]
    pub vocals: f64,
    #[serde(default = "unity")]
    pub drums: f64,
    #[serde(default = "unity")]
    pub bass: f64,
    #[serde(default = "unity")]
    pub other: f64,
}

fn unity() -> f64 {
    1.0
}

impl Default for StemVolumes {
    fn default() -> Self {
        Self {
            vocals: 1.0,
            drums: 1.0,
            bass: 1.0,
            other: 1.0,
        }
    }
}

impl StemVolumes {
    /// Volume for a stem.
    pub fn get(&self, stem: Stem) -> f64 {
        match stem {
            Stem::Vocals => self.vocals,
            Stem::Drums => self.drums,
            Stem::Bass => self.bass,
            Stem::Other => self.other,
        }
    }

    /// Set the volume for a stem. Negative values are clamped to 0.
    pub fn set(&mut self, stem: Stem, volume: f64) {
        let volume = if volume.is_finite() { volume.max(0.0) } else { 0.0 };
        match stem {
            Stem::Vocals => self.vocals = volume,
            Stem::Drums => self.drums = volume,
            Stem::Bass => self.bass = volume,
            Stem::Other => self.other = volume,
        }
    }
}

/// Which stems to write out in `Stems Only` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemSelection {
    #[serde(default)]
    pub vocals: bool,
    #[serde(default)]
    pub drums: bool,
    #[serde(default)]
    pub bass: bool,
    #[serde(default)]
    pub other: bool,
}

impl Default for StemSelection {
    fn default() -> Self {
        Self {
            vocals: true,
            drums: false,
            bass: false,
            other: false,
        }
    }
}

impl StemSelection {
    /// Selection with nothing checked.
    pub fn none() -> Self {
        Self {
            vocals: false,
            drums: false,
            bass: false,
            other: false,
        }
    }

    /// Selection with every stem checked.
    pub fn all() -> Self {
        Self {
            vocals: true,
            drums: true,
            bass: true,
            other: true,
        }
    }

    pub fn is_selected(&self, stem: Stem) -> bool {
        match stem {
            Stem::Vocals => self.vocals,
            Stem::Drums => self.drums,
            Stem::Bass => self.bass,
            Stem::Other => self.other,
        }
    }

    pub fn set(&mut self, stem: Stem, selected: bool) {
        match stem {
            Stem::Vocals => self.vocals = selected,
            Stem::Drums => self.drums = selected,
            Stem::Bass => self.bass = selected,
            Stem::Other => self.other = selected,
        }
    }

    /// Selected stems in canonical order.
    pub fn selected(&self) -> Vec<Stem> {
        Stem::ALL
            .into_iter()
            .filter(|s| self.is_selected(*s))
            .collect()
    }
}

/// Karaoke subtitle styling. Colors are `#RRGGBB` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaraokeStyle {
    #[serde(default = "default_font_name")]
    pub font_name: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Color of not-yet-sung text.
    #[serde(default = "default_upcoming_color")]
    pub upcoming_color: String,
    /// Color revealed as each word plays.
    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,
    #[serde(default = "default_black")]
    pub outline_color: String,
    #[serde(default = "default_black")]
    pub shadow_color: String,
}

fn default_font_name() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    30
}

fn default_upcoming_color() -> String {
    "#FFFFFF".to_string()
}

fn default_highlight_color() -> String {
    "#FF69B4".to_string()
}

fn default_black() -> String {
    "#000000".to_string()
}

impl Default for KaraokeStyle {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            font_size: default_font_size(),
            upcoming_color: default_upcoming_color(),
            highlight_color: default_highlight_color(),
            outline_color: default_black(),
            shadow_color: default_black(),
        }
    }
}

/// Everything a single pipeline run needs from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub source: SourceLocator,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub stem_volumes: StemVolumes,
    /// Pitch shift in semitones.
    #[serde(default)]
    pub pitch_semitones: i32,
    /// Playback speed multiplier.
    #[serde(default = "unity")]
    pub speed: f64,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub generate_lyrics: bool,
    #[serde(default)]
    pub whisper_model: WhisperModel,
    #[serde(default)]
    pub karaoke: KaraokeStyle,
    #[serde(default)]
    pub export_mode: ExportMode,
    /// Only meaningful when `export_mode` is not `Video`.
    #[serde(default)]
    pub export_format: ExportFormat,
    /// Only meaningful when `export_mode` is `StemsOnly`.
    #[serde(default)]
    pub stems_to_export: StemSelection,
}

impl JobParams {
    /// Create parameters with defaults for everything but source and output.
    pub fn new(source: SourceLocator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            stem_volumes: StemVolumes::default(),
            pitch_semitones: 0,
            speed: 1.0,
            normalize: false,
            generate_lyrics: false,
            whisper_model: WhisperModel::default(),
            karaoke: KaraokeStyle::default(),
            export_mode: ExportMode::default(),
            export_format: ExportFormat::default(),
            stems_to_export: StemSelection::default(),
        }
    }

    /// Whether the Transcribe stage should run.
    pub fn wants_transcription(&self) -> bool {
        self.generate_lyrics && self.export_mode.wants_subtitles()
    }

    /// Whether any audio effect is configured.
    pub fn has_effects(&self) -> bool {
        self.normalize || self.pitch_semitones != 0 || self.speed != 1.0
    }
}
