//! Export step - writes the final artifact(s) to the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{ExportMode, Stem};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::tools::{MuxRequest, VideoFilter};

use super::separate::stem_path;

/// `<output>/<title>_Remixed.<ext>`
pub fn remixed_path(output_dir: &Path, title: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{}_Remixed.{}", title, extension))
}

/// `<output>/<title>_stems`
pub fn stems_dir(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(format!("{}_stems", title))
}

/// `<stems dir>/<title>_<stem>.<ext>`
pub fn stem_output_path(dir: &Path, title: &str, stem: Stem, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", title, stem.as_str(), extension))
}

/// Branches on the export mode: remixed audio, individual stems, or video.
pub struct ExportStep;

impl ExportStep {
    pub fn new() -> Self {
        Self
    }

    fn export_audio(&self, ctx: &Context, state: &mut RunState) -> StepResult<()> {
        let format = ctx.params.export_format;
        let title = state.title()?;
        let output = remixed_path(&ctx.params.output_dir, title, format.extension());
        let audio = state.final_audio()?.to_path_buf();

        ctx.report(
            &format!("Exporting final audio to {}", output.display()),
            90.0,
        );
        ctx.tools
            .codec
            .apply_filters(&audio, &[], &output, Some(format.codec()))
            .map_err(|e| e.with_message("FFmpeg failed while exporting final audio."))?;

        ctx.report(
            &format!("Success! Audio saved to {}", output.display()),
            100.0,
        );
        state.outputs.push(output);
        Ok(())
    }

    fn export_stems(&self, ctx: &Context, state: &mut RunState) -> StepResult<()> {
        let format = ctx.params.export_format;
        let title = state.title()?.to_string();
        let separated = state.require_separated_dir()?.to_path_buf();
        let model = ctx.tools.separator.model_name();
        let out_dir = stems_dir(&ctx.params.output_dir, &title);
        fs::create_dir_all(&out_dir)
            .map_err(|e| StepError::io_error("creating stems directory", e))?;

        let mut written = Vec::new();
        for stem in ctx.params.stems_to_export.selected() {
            ctx.checkpoint()?;
            ctx.report(&format!("Exporting stem: {}...", stem), 90.0);

            let files: Vec<PathBuf> = state
                .chunk_files
                .iter()
                .map(|chunk| stem_path(&separated, model, chunk, stem))
                .filter(|p| p.exists())
                .collect();
            if files.is_empty() {
                ctx.logger
                    .info(&format!("No {} stem files found; skipping", stem));
                continue;
            }

            let list_file = state.scratch()?.join(format!("concat_{}.txt", stem));
            let output = stem_output_path(&out_dir, &title, stem, format.extension());
            ctx.tools
                .codec
                .concatenate(&files, &list_file, &output, Some(format.codec()))
                .map_err(|e| e.with_message(format!("FFmpeg failed while exporting {} stem.", stem)))?;
            written.push(output);
        }

        ctx.report(
            &format!("Success! Stems exported to {}", out_dir.display()),
            100.0,
        );
        state.outputs.extend(written);
        Ok(())
    }

    fn export_video(&self, ctx: &Context, state: &mut RunState) -> StepResult<()> {
        let title = state.title()?;
        let output = remixed_path(&ctx.params.output_dir, title, "mp4");
        let audio = state.final_audio()?.to_path_buf();
        let video = match state.video_stream.as_deref() {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => return Err(StepError::file_not_found(path.display().to_string())),
            None => return Err(StepError::invalid_input("No video stream to merge")),
        };

        ctx.report("Merging final video...", 95.0);
        let mut request = MuxRequest::new(video, audio, &output);

        if ctx.params.speed != 1.0 {
            request = request.with_filter(VideoFilter::Speed(ctx.params.speed));
        }
        if let Some(subtitle) = state.subtitle_file.as_deref().filter(|p| p.exists()) {
            ctx.report("Burning subtitles into video...", 97.0);
            request = request.with_filter(VideoFilter::BurnSubtitles(subtitle.to_path_buf()));
        }
        if let Some(graph) = request.video_filter_graph() {
            ctx.logger.command(&format!("-vf {}", graph));
        }

        ctx.tools.codec.mux(&request)?;

        ctx.report(
            &format!("Success! Final video saved to {}", output.display()),
            100.0,
        );
        state.outputs.push(output);
        Ok(())
    }
}

impl Default for ExportStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExportStep {
    fn name(&self) -> &str {
        "Export"
    }

    fn description(&self) -> &str {
        "Write the final video, audio or stems"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        state.title()?;
        match ctx.params.export_mode {
            ExportMode::StemsOnly => {
                state.require_separated_dir()?;
            }
            ExportMode::AudioOnly | ExportMode::Video => {
                state.final_audio()?;
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        fs::create_dir_all(&ctx.params.output_dir)
            .map_err(|e| StepError::io_error("creating output directory", e))?;

        match ctx.params.export_mode {
            ExportMode::AudioOnly => self.export_audio(ctx, state)?,
            ExportMode::StemsOnly => self.export_stems(ctx, state)?,
            ExportMode::Video => self.export_video(ctx, state)?,
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if let Some(missing) = state.outputs.iter().find(|p| !p.exists()) {
            return Err(StepError::invalid_output(format!(
                "Expected output was not written: {}",
                missing.display()
            )));
        }
        Ok(())
    }
}
