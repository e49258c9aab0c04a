//! Acquire step - produces the canonical audio track and the video stream.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use url::Url;

use crate::models::{ExportMode, SourceLocator};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// yt-dlp format selector for the video stream.
pub const VIDEO_SELECTOR: &str = "bestvideo[ext=mp4]/best[ext=mp4]";
/// yt-dlp format selector for the audio stream.
pub const AUDIO_SELECTOR: &str = "bestaudio/best";

/// File name of the canonical audio track inside the scratch directory.
pub const FULL_AUDIO_FILE: &str = "full_audio.wav";
const VIDEO_STEM: &str = "video_stream";
const RAW_AUDIO_STEM: &str = "full_audio_src";

/// Local sources are decoded directly; remote sources are downloaded and
/// then converted.
pub struct AcquireStep;

impl AcquireStep {
    pub fn new() -> Self {
        Self
    }

    fn download(
        &self,
        ctx: &Context,
        url: &Url,
        selector: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> StepResult<PathBuf> {
        ctx.logger
            .command(&format!("yt-dlp -f {} {}", selector, url));

        let mut on_progress = |pct: f64| {
            if ctx.cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            ctx.report(&format!("Downloading: {:.1}%", pct), 11.0);
            ControlFlow::Continue(())
        };

        let path = ctx
            .tools
            .downloader
            .download(url, selector, dest_dir, file_stem, &mut on_progress)?;
        ctx.logger.info(&format!("Downloaded {}", path.display()));
        Ok(path)
    }
}

impl Default for AcquireStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AcquireStep {
    fn name(&self) -> &str {
        "Acquire"
    }

    fn description(&self) -> &str {
        "Obtain canonical audio and the video stream"
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        state.scratch()?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.report("Acquiring media...", 10.0);

        let scratch_dir = state.scratch()?.path().to_path_buf();
        let full_audio = scratch_dir.join(FULL_AUDIO_FILE);
        let format = ctx.audio_format();

        match &ctx.params.source {
            SourceLocator::Local(path) => {
                ctx.report(
                    &format!("Extracting audio from local file: {}", path.display()),
                    11.0,
                );
                ctx.tools
                    .codec
                    .extract_audio(path, &full_audio, &format)?;
                state.video_stream = Some(path.clone());
            }
            SourceLocator::Remote(url) => {
                if ctx.params.export_mode == ExportMode::Video {
                    let video = self.download(ctx, url, VIDEO_SELECTOR, &scratch_dir, VIDEO_STEM)?;
                    state.video_stream = Some(video);
                } else {
                    ctx.logger.info(&format!(
                        "Skipping video download for {} export",
                        ctx.params.export_mode
                    ));
                }

                let raw = self.download(ctx, url, AUDIO_SELECTOR, &scratch_dir, RAW_AUDIO_STEM)?;

                ctx.report("Converting downloaded audio to WAV...", 13.0);
                ctx.tools
                    .codec
                    .extract_audio(&raw, &full_audio, &format)
                    .map_err(|e| e.with_message("FFmpeg failed during audio conversion."))?;

                if let Err(e) = fs::remove_file(&raw) {
                    ctx.logger
                        .warn(&format!("Could not delete {}: {}", raw.display(), e));
                }
            }
        }

        state.full_audio = Some(full_audio);
        ctx.report("Media acquisition complete.", 15.0);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        state.require_full_audio()?;

        if ctx.params.export_mode == ExportMode::Video {
            match state.video_stream.as_deref() {
                Some(path) if path.exists() => {}
                Some(path) => return Err(StepError::file_not_found(path.display().to_string())),
                None => return Err(StepError::invalid_output("Failed to download video stream.")),
            }
        }
        Ok(())
    }
}
