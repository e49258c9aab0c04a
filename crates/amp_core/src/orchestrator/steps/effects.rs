//! Effects step - loudness, pitch and tempo on the master mix.

use crate::models::{ExportMode, JobParams};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::tools::{filter_chain, AudioFilter};

/// File name of the processed mix inside the scratch directory.
pub const EFFECTED_AUDIO_FILE: &str = "effected_audio.wav";

/// Filters requested by the job, in application order:
/// normalize, then pitch, then tempo.
pub fn effect_chain(params: &JobParams) -> Vec<AudioFilter> {
    let mut chain = Vec::new();
    if params.normalize {
        chain.push(AudioFilter::Loudnorm);
    }
    if params.pitch_semitones != 0 {
        chain.push(AudioFilter::pitch_semitones(params.pitch_semitones));
    }
    if params.speed != 1.0 {
        chain.push(AudioFilter::Tempo {
            factor: params.speed,
        });
    }
    chain
}

pub struct EffectsStep;

impl EffectsStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EffectsStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for EffectsStep {
    fn name(&self) -> &str {
        "Effects"
    }

    fn description(&self) -> &str {
        "Apply normalization, pitch and speed"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        state.require_mixed_audio()?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        if ctx.params.export_mode == ExportMode::StemsOnly {
            return Ok(StepOutcome::Skipped(
                "stems are exported without effects".to_string(),
            ));
        }

        if !ctx.params.has_effects() {
            return Ok(StepOutcome::Skipped("no effects configured".to_string()));
        }
        let chain = effect_chain(&ctx.params);

        ctx.report("Applying audio effects...", 85.0);
        ctx.logger.command(&format!("-af {}", filter_chain(&chain)));

        let input = state.require_mixed_audio()?.to_path_buf();
        let output = state.scratch()?.join(EFFECTED_AUDIO_FILE);
        let format = ctx.audio_format();

        ctx.tools
            .codec
            .apply_filters(&input, &chain, &output, Some(&format.codec))?;

        state.effected_audio = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        state.final_audio()?;
        if let Some(path) = state.effected_audio.as_deref() {
            if !path.exists() {
                return Err(StepError::file_not_found(path.display().to_string()));
            }
        }
        Ok(())
    }
}
