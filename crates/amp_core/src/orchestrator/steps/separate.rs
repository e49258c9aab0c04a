//! Separate step - splits every chunk into four stems.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::models::Stem;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::progress_bridge::{SeparationProgress, SEPARATION_END, SEPARATION_START};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Where the separator writes `stem` for `chunk`:
/// `<separated>/<model>/<chunk file stem>/<stem>.wav`.
pub fn stem_path(separated_dir: &Path, model: &str, chunk: &Path, stem: Stem) -> PathBuf {
    let chunk_name = chunk
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    separated_dir
        .join(model)
        .join(chunk_name)
        .join(format!("{}.wav", stem.as_str()))
}

/// Runs the separator once over all chunks, translating its progress bars
/// into the 30-70% band.
pub struct SeparateStep;

impl SeparateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeparateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SeparateStep {
    fn name(&self) -> &str {
        "Separate"
    }

    fn description(&self) -> &str {
        "Separate vocals, drums, bass and other"
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.chunk_files.is_empty() {
            return Err(StepError::invalid_input("No chunks to separate"));
        }
        state.device()?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.report("Separating all stems...", SEPARATION_START);

        let device = state.device()?;
        let out_dir = state
            .scratch()?
            .subdir("separated")
            .map_err(|e| StepError::io_error("creating separation directory", e))?;
        let separator = &ctx.tools.separator;

        ctx.logger.command(&format!(
            "demucs -n {} --device {} ({} chunk(s))",
            separator.model_name(),
            device,
            state.chunk_files.len()
        ));

        let mut progress = SeparationProgress::new(state.chunk_files.len());
        let mut on_line = |line: &str| {
            if ctx.cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            ctx.logger.output_line(line);
            if let Some(tick) = progress.observe(line) {
                ctx.report(&tick.message, tick.percent);
            }
            ControlFlow::Continue(())
        };

        separator.separate(&out_dir, device, &state.chunk_files, &mut on_line)?;

        let model_dir = out_dir.join(separator.model_name());
        if !model_dir.is_dir() {
            ctx.logger.warn(&format!(
                "Separator produced no output under {}",
                model_dir.display()
            ));
        }

        state.separated_dir = Some(out_dir);
        ctx.report("AI separation complete.", SEPARATION_END);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let dir = state.require_separated_dir()?;
        if !dir.is_dir() {
            return Err(StepError::file_not_found(dir.display().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_paths_follow_tool_layout() {
        let path = stem_path(
            Path::new("/tmp/run/separated"),
            "htdemucs",
            Path::new("/tmp/run/chunks/chunk_002.wav"),
            Stem::Bass,
        );
        assert_eq!(
            path,
            PathBuf::from("/tmp/run/separated/htdemucs/chunk_002/bass.wav")
        );
    }
}
