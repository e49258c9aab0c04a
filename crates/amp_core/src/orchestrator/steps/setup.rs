//! Setup step - resolves the title, scratch directory and compute device.

use crate::models::SourceLocator;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::scratch::ScratchSpace;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::tools::resolve_device;

/// Title used when a remote source reports none.
const REMOTE_FALLBACK_TITLE: &str = "video";
/// Title used when sanitizing leaves nothing.
const EMPTY_TITLE: &str = "media";

/// Remove characters that are not allowed in file names.
///
/// An empty result becomes `media`.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        EMPTY_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// First step of every run. Any failure here is fatal: without a title
/// there is nowhere to put scratch files or outputs.
pub struct SetupStep;

impl SetupStep {
    pub fn new() -> Self {
        Self
    }

    fn resolve_title(&self, ctx: &Context) -> StepResult<String> {
        let raw = match &ctx.params.source {
            SourceLocator::Local(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            SourceLocator::Remote(url) => {
                let title = ctx.tools.downloader.probe_title(url)?;
                if title.trim().is_empty() {
                    REMOTE_FALLBACK_TITLE.to_string()
                } else {
                    title
                }
            }
        };
        Ok(sanitize_title(&raw))
    }
}

impl Default for SetupStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SetupStep {
    fn name(&self) -> &str {
        "Setup"
    }

    fn description(&self) -> &str {
        "Resolve title, create scratch directory and pick a device"
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        if let SourceLocator::Local(path) = &ctx.params.source {
            if !path.exists() {
                return Err(StepError::file_not_found(path.display().to_string()));
            }
        }
        if ctx.params.output_dir.as_os_str().is_empty() {
            return Err(StepError::invalid_input("No output directory"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let device = resolve_device(ctx.settings.processing.device);
        ctx.report(&format!("Using processing device: {}", device), 0.0);

        ctx.report("Getting media title...", 1.0);
        let title = self.resolve_title(ctx)?;
        ctx.logger.info(&format!("Title: {}", title));

        let base = ctx.settings.paths.scratch_root(&ctx.params.output_dir);
        let scratch = ScratchSpace::create(&base, &title)
            .map_err(|e| StepError::io_error("creating temp directory", e))?;
        ctx.report(
            &format!("Creating temp directory: {}", scratch.path().display()),
            2.0,
        );

        state.device = Some(device);
        state.title = Some(title);
        state.scratch = Some(scratch);

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let scratch = state.scratch()?;
        if !scratch.path().is_dir() {
            return Err(StepError::invalid_output(format!(
                "Temp directory missing: {}",
                scratch.path().display()
            )));
        }
        state.title()?;
        state.device()?;
        Ok(())
    }
}
