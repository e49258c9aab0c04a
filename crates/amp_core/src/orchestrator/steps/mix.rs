//! Mix step - remixes each chunk's stems and joins the chunks.

use std::path::{Path, PathBuf};

use crate::models::{Stem, StemVolumes};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::tools::MixInput;

use super::separate::stem_path;

/// File name of the joined mix inside the scratch directory.
pub const MIXED_AUDIO_FILE: &str = "mixed_audio.wav";

/// Stems of `chunk` that exist on disk and have a volume above zero.
pub fn qualifying_inputs(
    separated_dir: &Path,
    model: &str,
    chunk: &Path,
    volumes: &StemVolumes,
) -> Vec<MixInput> {
    Stem::ALL
        .into_iter()
        .filter(|stem| volumes.get(*stem) > 0.0)
        .map(|stem| (stem_path(separated_dir, model, chunk, stem), volumes.get(stem)))
        .filter(|(path, _)| path.exists())
        .map(|(path, volume)| MixInput::new(path, volume))
        .collect()
}

/// `mixed_chunk_000.wav`, ...
pub fn mixed_chunk_name(index: usize) -> String {
    format!("mixed_chunk_{:03}.wav", index)
}

pub struct MixStep;

impl MixStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MixStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MixStep {
    fn name(&self) -> &str {
        "Mix"
    }

    fn description(&self) -> &str {
        "Apply stem volumes and join chunks"
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        state.require_separated_dir()?;
        if state.chunk_files.is_empty() {
            return Err(StepError::invalid_input("No chunks to mix"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.report("Mixing audio stems...", 75.0);

        let separated = state.require_separated_dir()?.to_path_buf();
        let model = ctx.tools.separator.model_name();
        let scratch = state.scratch()?;
        let mixed_dir = scratch
            .subdir("mixed_chunks")
            .map_err(|e| StepError::io_error("creating mixed chunks directory", e))?;
        let format = ctx.audio_format();
        let chunk_len = ctx.chunk_len();
        let count = state.chunk_files.len();

        let mut mixed: Vec<PathBuf> = Vec::with_capacity(count);
        for (index, chunk) in state.chunk_files.iter().enumerate() {
            ctx.checkpoint()?;

            let output = mixed_dir.join(mixed_chunk_name(index));
            let inputs = qualifying_inputs(&separated, model, chunk, &ctx.params.stem_volumes);

            if inputs.is_empty() {
                ctx.logger.warn(&format!(
                    "No audible stems for chunk {}; writing {}s of silence",
                    index, chunk_len
                ));
                ctx.tools.codec.silence(chunk_len, &format, &output)?;
            } else {
                ctx.logger.debug(&format!(
                    "Chunk {}: mixing {} stem(s)",
                    index,
                    inputs.len()
                ));
                ctx.tools.codec.mix(&inputs, &output)?;
            }
            mixed.push(output);

            let percent = 75.0 + 4.0 * (index + 1) as f64 / count as f64;
            ctx.report(&format!("Mixed chunk {}/{}", index + 1, count), percent);
        }

        if let Some(missing) = mixed.iter().find(|p| !p.exists()) {
            return Err(StepError::other(format!(
                "No mixed audio chunk found for merging: {}",
                missing.display()
            )));
        }

        ctx.report("Merging mixed chunks...", 80.0);
        let mixed_audio = scratch.join(MIXED_AUDIO_FILE);
        let list_file = scratch.join("concat_list.txt");
        ctx.tools
            .codec
            .concatenate(&mixed, &list_file, &mixed_audio, None)?;

        state.mixed_chunks = mixed;
        state.mixed_audio = Some(mixed_audio);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        state.require_mixed_audio()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_stems(separated: &Path, chunk: &Path, stems: &[Stem]) {
        for stem in stems {
            let path = stem_path(separated, "htdemucs", chunk, *stem);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"RIFF").unwrap();
        }
    }

    #[test]
    fn muted_and_missing_stems_do_not_qualify() {
        let dir = tempdir().unwrap();
        let chunk = dir.path().join("chunks/chunk_000.wav");
        write_stems(dir.path(), &chunk, &[Stem::Vocals, Stem::Drums, Stem::Bass]);

        let mut volumes = StemVolumes::default();
        volumes.set(Stem::Drums, 0.0);
        volumes.set(Stem::Bass, 0.4);

        let inputs = qualifying_inputs(dir.path(), "htdemucs", &chunk, &volumes);
        let volumes: Vec<f64> = inputs.iter().map(|i| i.volume).collect();
        assert_eq!(volumes, vec![1.0, 0.4]);
        assert!(inputs[0].path.ends_with("chunk_000/vocals.wav"));
        assert!(inputs[1].path.ends_with("chunk_000/bass.wav"));
    }

    #[test]
    fn all_muted_means_no_inputs() {
        let dir = tempdir().unwrap();
        let chunk = dir.path().join("chunks/chunk_000.wav");
        write_stems(dir.path(), &chunk, &Stem::ALL);

        let mut volumes = StemVolumes::default();
        for stem in Stem::ALL {
            volumes.set(stem, 0.0);
        }
        assert!(qualifying_inputs(dir.path(), "htdemucs", &chunk, &volumes).is_empty());
    }

    #[test]
    fn mixed_names_are_zero_padded() {
        assert_eq!(mixed_chunk_name(7), "mixed_chunk_007.wav");
    }
}
