//! Transcribe step - word-timed lyrics rendered as karaoke subtitles.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::subtitles::write_karaoke;

/// File name of the subtitle document inside the scratch directory.
pub const SUBTITLE_FILE: &str = "lyrics.ass";

/// Runs only for video exports with lyrics enabled.
pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TranscribeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn description(&self) -> &str {
        "Transcribe vocals into karaoke subtitles"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if ctx.params.wants_transcription() {
            state.require_full_audio()?;
            state.device()?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        if !ctx.params.generate_lyrics {
            return Ok(StepOutcome::Skipped("lyrics not requested".to_string()));
        }
        if !ctx.params.wants_transcription() {
            return Ok(StepOutcome::Skipped(format!(
                "subtitles are not used for {} export",
                ctx.params.export_mode
            )));
        }

        let model = ctx.params.whisper_model;
        let audio = state.require_full_audio()?.to_path_buf();
        let device = state.device()?;

        ctx.report(
            &format!("Transcribing lyrics with '{}' model...", model),
            18.0,
        );
        ctx.busy("Running transcription model (this can take a while)...");

        let result = ctx.tools.transcriber.transcribe(&audio, model, device)?;
        ctx.checkpoint()?;

        if result.is_empty() {
            ctx.logger.warn("No lyrics were recognized; subtitles will be empty");
        } else {
            ctx.logger.info(&format!(
                "Recognized {} lines, {} words",
                result.segments.len(),
                result.word_count()
            ));
        }

        let path = state.scratch()?.join(SUBTITLE_FILE);
        write_karaoke(
            &result,
            &ctx.params.karaoke,
            ctx.settings.processing.lyric_lead_in_secs,
            &path,
        )
        .map_err(|e| StepError::io_error("writing karaoke subtitles", e))?;

        state.subtitle_file = Some(path);
        ctx.report("Transcription complete.", 25.0);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        match state.subtitle_file.as_deref() {
            Some(path) if path.exists() => Ok(()),
            Some(path) => Err(StepError::file_not_found(path.display().to_string())),
            None => Err(StepError::invalid_output("Subtitle file not recorded")),
        }
    }
}
