//! Pipeline runner that executes steps in sequence.

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, RunState, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// The pipeline executes steps in order, running validation before
/// and after each step. Cancellation is checked before every step, and
/// the run's scratch directory is removed after the last step whether
/// the run succeeded, failed or was cancelled.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run the pipeline with the given context and state.
    ///
    /// Executes each step in order:
    /// 1. Check for cancellation
    /// 2. Run `validate_input`
    /// 3. Run `execute`
    /// 4. Run `validate_output` (if execute returned Success)
    ///
    /// On failure a final error event is reported. Cleanup always runs
    /// afterwards and never changes the result.
    pub fn run(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<PipelineRunResult> {
        let result = self.run_steps(ctx, state);

        if let Err(ref e) = result {
            report_failure(ctx, e);
        }

        cleanup(ctx, state);
        result
    }

    fn run_steps(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
            outputs: Vec::new(),
        };

        for step in &self.steps {
            let step_name = step.name();

            if ctx.cancel.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            ctx.logger.phase(step_name);
            tracing::debug!("[{}] {}", ctx.job_name, step.description());

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(&ctx.job_name, step_name, e));
            }

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            let outcome = step.execute(ctx, state).map_err(|e| {
                if !e.is_cancelled() {
                    ctx.logger.error(&format!("Execution failed: {}", e));
                    ctx.logger.show_tail(step_name);
                }
                PipelineError::step_failed(&ctx.job_name, step_name, e)
            })?;

            match outcome {
                StepOutcome::Success => {
                    ctx.logger
                        .debug(&format!("Validating output for '{}'", step_name));
                    if let Err(e) = step.validate_output(ctx, state) {
                        ctx.logger.error(&format!("Output validation failed: {}", e));
                        return Err(PipelineError::step_failed(&ctx.job_name, step_name, e));
                    }

                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }
        }

        result.outputs = state.outputs.clone();
        ctx.logger.success("Pipeline completed successfully");
        Ok(result)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Text of the final event for a failed run.
pub fn failure_message(error: &PipelineError) -> String {
    if error.is_cancelled() {
        return error.summary();
    }
    match error.detail() {
        Some(detail) => format!("Processing error: {}\nDetails:\n{}", error.summary(), detail),
        None => format!("Processing error: {}", error.summary()),
    }
}

fn report_failure(ctx: &Context, error: &PipelineError) {
    if error.is_cancelled() {
        ctx.logger.warn(&error.summary());
    } else {
        ctx.logger.error(&error.to_string());
    }
    ctx.report(&failure_message(error), 100.0);
}

/// Remove the run's scratch directory, downgrading failure to a warning.
fn cleanup(ctx: &Context, state: &mut RunState) {
    let Some(scratch) = state.scratch.take() else {
        return;
    };

    let path = scratch.path().to_path_buf();
    match scratch.remove() {
        Ok(()) => {
            tracing::debug!("Removed scratch directory {}", path.display());
            ctx.report("Cleanup complete.", 100.0);
        }
        Err(e) => {
            ctx.logger.warn(&format!(
                "Could not remove temp directory {}: {}",
                path.display(),
                e
            ));
            ctx.report(
                &format!("Warning: could not remove temp directory: {}", e),
                100.0,
            );
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
    /// Files written to the output directory.
    pub outputs: Vec<std::path::PathBuf>,
}

impl PipelineRunResult {
    /// Check if all steps completed (none skipped).
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::errors::{StepError, StepResult};
    use crate::tools::ToolError;

    #[test]
    fn failure_message_includes_detail() {
        let err = PipelineError::step_failed(
            "song",
            "Separate",
            StepError::from(ToolError::failed(
                "demucs",
                "Demucs failed.",
                "CUDA out of memory",
                Some(1),
            )),
        );
        assert_eq!(
            failure_message(&err),
            "Processing error: Demucs failed.\nDetails:\nCUDA out of memory"
        );
    }

    #[test]
    fn failure_message_without_detail() {
        let err = PipelineError::step_failed("song", "Split", StepError::other("Bad duration"));
        assert_eq!(failure_message(&err), "Processing error: Bad duration");
    }

    #[test]
    fn cancellation_message_is_distinct() {
        let err = PipelineError::step_failed("song", "Mix", StepError::Cancelled);
        assert_eq!(failure_message(&err), "Processing was cancelled by the user.");
    }

    struct NamedStep(&'static str);

    impl PipelineStep for NamedStep {
        fn name(&self) -> &str {
            self.0
        }

        fn validate_input(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut RunState) -> StepResult<StepOutcome> {
            Ok(StepOutcome::Success)
        }

        fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn pipeline_builds_correctly() {
        let pipeline = Pipeline::new()
            .with_step(NamedStep("Step1"))
            .with_step(NamedStep("Step2"));

        assert_eq!(pipeline.step_count(), 2);
        assert_eq!(pipeline.step_names(), vec!["Step1", "Step2"]);
    }
}
