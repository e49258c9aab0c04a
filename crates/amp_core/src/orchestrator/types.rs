//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::{Device, JobParams, ProgressEvent};
use crate::tools::{AudioFormat, Toolset};

use super::cancel::CancelToken;
use super::errors::{StepError, StepResult};
use super::scratch::ScratchSpace;

/// Progress callback type for reporting pipeline progress.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Contains the job snapshot and shared resources that steps can read
/// but not modify. Mutable state goes in `RunState`.
pub struct Context {
    /// Parameters of the job being run.
    pub params: JobParams,
    /// Application settings.
    pub settings: Settings,
    /// Job name/identifier.
    pub job_name: String,
    /// External tools.
    pub tools: Toolset,
    /// Cancellation shared with the caller.
    pub cancel: CancelToken,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a job.
    pub fn new(
        params: JobParams,
        settings: Settings,
        job_name: impl Into<String>,
        tools: Toolset,
        cancel: CancelToken,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            params,
            settings,
            job_name: job_name.into(),
            tools,
            cancel,
            logger,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report determinate progress.
    pub fn report(&self, message: &str, percent: f64) {
        let event = ProgressEvent::new(message, percent);
        self.logger.progress(event.percent as u32, message);
        self.emit(event);
    }

    /// Report work with no measurable sub-progress.
    pub fn busy(&self, message: &str) {
        self.logger.info(message);
        self.emit(ProgressEvent::busy(message));
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Canonical intermediate audio format from settings.
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::pcm(
            self.settings.processing.sample_rate,
            self.settings.processing.channels,
        )
    }

    /// Configured chunk length in seconds.
    pub fn chunk_len(&self) -> f64 {
        self.settings.processing.chunk_duration_secs
    }

    /// Check the cancellation token, logging when it fires.
    pub fn checkpoint(&self) -> StepResult<()> {
        self.cancel.checkpoint().inspect_err(|_| {
            self.logger.warn("Cancellation requested");
        })
    }
}

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (with reason).
    Skipped(String),
}

/// Mutable state of one pipeline run.
///
/// Steps record the artifacts they produce here; later steps read them.
/// Everything except `outputs` lives inside the scratch directory and is
/// discarded with it.
#[derive(Debug, Default)]
pub struct RunState {
    /// Unique job identifier.
    pub job_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Filesystem-safe title used for scratch and output names.
    pub title: Option<String>,
    /// Scratch directory (taken by the pipeline for cleanup).
    pub scratch: Option<ScratchSpace>,
    /// Compute device chosen at setup.
    pub device: Option<Device>,
    /// Canonical audio track.
    pub full_audio: Option<PathBuf>,
    /// Source of the video stream for video exports.
    pub video_stream: Option<PathBuf>,
    /// Karaoke subtitle file, when transcription ran.
    pub subtitle_file: Option<PathBuf>,
    /// Duration of the canonical audio in seconds.
    pub duration: Option<f64>,
    /// Chunk files in index order.
    pub chunk_files: Vec<PathBuf>,
    /// Root of the separation output.
    pub separated_dir: Option<PathBuf>,
    /// Mixed chunk files in index order.
    pub mixed_chunks: Vec<PathBuf>,
    /// All mixed chunks joined.
    pub mixed_audio: Option<PathBuf>,
    /// Mixed audio after effects.
    pub effected_audio: Option<PathBuf>,
    /// Files written to the output directory.
    pub outputs: Vec<PathBuf>,
}

impl RunState {
    /// Create a new run state with the given ID.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn title(&self) -> StepResult<&str> {
        self.title
            .as_deref()
            .ok_or_else(|| StepError::invalid_input("Title has not been resolved"))
    }

    pub fn scratch(&self) -> StepResult<&ScratchSpace> {
        self.scratch
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Scratch directory has not been created"))
    }

    pub fn device(&self) -> StepResult<Device> {
        self.device
            .ok_or_else(|| StepError::invalid_input("Processing device has not been chosen"))
    }

    pub fn require_full_audio(&self) -> StepResult<&Path> {
        require(&self.full_audio, "Canonical audio")
    }

    pub fn require_mixed_audio(&self) -> StepResult<&Path> {
        require(&self.mixed_audio, "Mixed audio")
    }

    pub fn require_separated_dir(&self) -> StepResult<&Path> {
        self.separated_dir
            .as_deref()
            .ok_or_else(|| StepError::invalid_input("Separation has not run"))
    }

    /// Audio to export: the effected mix if effects ran, else the plain mix.
    pub fn final_audio(&self) -> StepResult<&Path> {
        match self.effected_audio.as_deref() {
            Some(path) => Ok(path),
            None => self.require_mixed_audio(),
        }
    }
}

fn require<'a>(path: &'a Option<PathBuf>, what: &str) -> StepResult<&'a Path> {
    match path.as_deref() {
        Some(p) if p.exists() => Ok(p),
        Some(p) => Err(StepError::file_not_found(p.display().to_string())),
        None => Err(StepError::invalid_input(format!("{} has not been produced", what))),
    }
}
