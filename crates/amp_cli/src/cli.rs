//! Command line definitions.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use amp_core::config::JobDefaults;
use amp_core::logging::LogLevel;
use amp_core::models::{
    ExportFormat, ExportMode, JobParams, SourceLocator, Stem, StemSelection, WhisperModel,
};

#[derive(Debug, Parser)]
#[command(name = "amp", version, about = "Remix songs and videos by separating and rebalancing stems")]
pub struct Cli {
    /// Config file (default: .config/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true, value_parser = parse_level)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Queue one job per source and process them in order
    Run(RunArgs),
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Local media files or video page URLs
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Output directory (default: paths.default_output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub vocals: Option<f64>,
    #[arg(long)]
    pub drums: Option<f64>,
    #[arg(long)]
    pub bass: Option<f64>,
    #[arg(long)]
    pub other: Option<f64>,

    /// Pitch shift in semitones
    #[arg(long, allow_negative_numbers = true)]
    pub pitch: Option<i32>,

    /// Playback speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,

    /// Apply loudness normalization
    #[arg(long)]
    pub normalize: bool,

    /// Burn karaoke lyrics into video exports
    #[arg(long, overrides_with = "no_lyrics")]
    pub lyrics: bool,

    #[arg(long, overrides_with = "lyrics")]
    pub no_lyrics: bool,

    /// Transcription model (tiny, base, small, medium, large-v3)
    #[arg(long, value_parser = parse_model)]
    pub model: Option<WhisperModel>,

    /// What to export (video, audio, stems)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ExportMode>,

    /// Audio format for audio and stem exports (mp3, wav, flac)
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// Stems to export in stems mode, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_stem)]
    pub stems: Option<Vec<Stem>>,

    #[arg(long)]
    pub font: Option<String>,
    #[arg(long)]
    pub font_size: Option<u32>,
    /// Color of lyrics not yet sung (#RRGGBB)
    #[arg(long)]
    pub upcoming: Option<String>,
    /// Color lyrics fill with as they are sung (#RRGGBB)
    #[arg(long)]
    pub highlight: Option<String>,
    #[arg(long)]
    pub outline: Option<String>,
    #[arg(long)]
    pub shadow: Option<String>,

    /// Print job log lines as well as progress
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Job parameters for `source`: config defaults overlaid with flags.
    pub fn to_params(
        &self,
        defaults: &JobDefaults,
        source: &str,
        default_output: &Path,
    ) -> JobParams {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output.to_path_buf());
        let mut params = defaults.to_params(SourceLocator::parse(source), output);

        let volumes = [
            (Stem::Vocals, self.vocals),
            (Stem::Drums, self.drums),
            (Stem::Bass, self.bass),
            (Stem::Other, self.other),
        ];
        for (stem, volume) in volumes {
            if let Some(volume) = volume {
                params.stem_volumes.set(stem, volume);
            }
        }

        if let Some(pitch) = self.pitch {
            params.pitch_semitones = pitch;
        }
        if let Some(speed) = self.speed {
            params.speed = speed;
        }
        if self.normalize {
            params.normalize = true;
        }
        if self.lyrics {
            params.generate_lyrics = true;
        } else if self.no_lyrics {
            params.generate_lyrics = false;
        }
        if let Some(model) = self.model {
            params.whisper_model = model;
        }
        if let Some(mode) = self.mode {
            params.export_mode = mode;
        }
        if let Some(format) = self.format {
            params.export_format = format;
        }
        if let Some(ref stems) = self.stems {
            let mut selection = StemSelection::none();
            for stem in stems {
                selection.set(*stem, true);
            }
            params.stems_to_export = selection;
        }

        let karaoke = &mut params.karaoke;
        if let Some(ref font) = self.font {
            karaoke.font_name = font.clone();
        }
        if let Some(size) = self.font_size {
            karaoke.font_size = size;
        }
        let colors = [
            (&mut karaoke.upcoming_color, &self.upcoming),
            (&mut karaoke.highlight_color, &self.highlight),
            (&mut karaoke.outline_color, &self.outline),
            (&mut karaoke.shadow_color, &self.shadow),
        ];
        for (slot, value) in colors {
            if let Some(color) = value {
                *slot = color.clone();
            }
        }

        params
    }
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::from_name(s).ok_or_else(|| format!("unknown log level '{}'", s))
}

fn parse_model(s: &str) -> Result<WhisperModel, String> {
    WhisperModel::from_name(s).ok_or_else(|| format!("unknown model '{}'", s))
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_name(s).ok_or_else(|| format!("unknown format '{}'", s))
}

fn parse_stem(s: &str) -> Result<Stem, String> {
    Stem::from_name(s).ok_or_else(|| format!("unknown stem '{}'", s))
}

fn parse_mode(s: &str) -> Result<ExportMode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "video" => Ok(ExportMode::Video),
        "audio" | "audio-only" => Ok(ExportMode::AudioOnly),
        "stems" | "stems-only" => Ok(ExportMode::StemsOnly),
        _ => Err(format!("unknown export mode '{}'", s)),
    }
}
