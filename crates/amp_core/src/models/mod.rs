//! Data models for the media processor.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for stems, export modes/formats, model sizes, devices
//! - Job parameters (the immutable snapshot a run executes)
//! - Transcription results (segments and timed words)
//! - Progress events

mod enums;
mod job;
mod progress;
mod transcription;

// Re-export all public types
pub use enums::{
    format_to_codec, Device, DevicePreference, ExportFormat, ExportMode, Stem, WhisperModel,
};
pub use job::{JobParams, KaraokeStyle, SourceLocator, StemSelection, StemVolumes};
pub use progress::ProgressEvent;
pub use transcription::{Segment, TranscriptionResult, Word};
