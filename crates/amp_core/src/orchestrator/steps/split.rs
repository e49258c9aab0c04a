//! Split step - cuts the canonical audio into fixed-length chunks.

use std::path::PathBuf;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Number of chunks needed to cover `duration` seconds (at least one).
pub fn chunk_count(duration: f64, chunk_len: f64) -> usize {
    if !(duration > 0.0 && chunk_len > 0.0) {
        return 1;
    }
    ((duration / chunk_len).ceil() as usize).max(1)
}

/// Start and length of chunk `index`; the last chunk is shorter.
pub fn chunk_bounds(index: usize, duration: f64, chunk_len: f64) -> (f64, f64) {
    let start = index as f64 * chunk_len;
    let length = chunk_len.min(duration - start).max(0.0);
    (start, length)
}

/// `chunk_000.wav`, `chunk_001.wav`, ...
pub fn chunk_file_name(index: usize) -> String {
    format!("chunk_{:03}.wav", index)
}

pub struct SplitStep;

impl SplitStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SplitStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SplitStep {
    fn name(&self) -> &str {
        "Split"
    }

    fn description(&self) -> &str {
        "Split audio into chunks for separation"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        state.require_full_audio()?;
        let chunk_len = ctx.chunk_len();
        if !(chunk_len.is_finite() && chunk_len > 0.0) {
            return Err(StepError::invalid_input(format!(
                "Chunk duration must be positive, got {}",
                chunk_len
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.report("Splitting audio...", 25.0);

        let audio = state.require_full_audio()?.to_path_buf();
        let duration = ctx.tools.codec.probe_duration(&audio)?;
        if !(duration.is_finite() && duration > 0.0) {
            return Err(StepError::other(format!(
                "Invalid media duration: {} seconds",
                duration
            )));
        }

        let chunk_len = ctx.chunk_len();
        let count = chunk_count(duration, chunk_len);
        ctx.logger.info(&format!(
            "Duration {:.2}s -> {} chunk(s) of {}s",
            duration, count, chunk_len
        ));

        let chunks_dir = state
            .scratch()?
            .subdir("chunks")
            .map_err(|e| StepError::io_error("creating chunks directory", e))?;

        let mut files: Vec<PathBuf> = Vec::with_capacity(count);
        for index in 0..count {
            ctx.checkpoint()?;

            let (start, length) = chunk_bounds(index, duration, chunk_len);
            let path = chunks_dir.join(chunk_file_name(index));
            ctx.tools.codec.slice(&audio, start, length, &path)?;
            files.push(path);

            let percent = 25.0 + 5.0 * (index + 1) as f64 / count as f64;
            ctx.report(&format!("Split chunk {}/{}", index + 1, count), percent);
        }

        state.duration = Some(duration);
        state.chunk_files = files;
        ctx.report("Splitting complete.", 30.0);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.chunk_files.is_empty() {
            return Err(StepError::invalid_output("No chunks were written"));
        }
        if let Some(missing) = state.chunk_files.iter().find(|p| !p.exists()) {
            return Err(StepError::file_not_found(missing.display().to_string()));
        }
        Ok(())
    }
}
