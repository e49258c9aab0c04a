//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct SplitStep;
///
/// impl PipelineStep for SplitStep {
///     fn name(&self) -> &str { "Split" }
///
///     fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
///         state.require_full_audio().map(|_| ())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
///         // slice the canonical audio...
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
///         if state.chunk_files.is_empty() {
///             return Err(StepError::invalid_output("No chunks written"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    ///
    /// Should check that everything earlier steps were supposed to produce
    /// is present in `state`.
    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Records results in `state`. Use `ctx.logger` for logging and
    /// `ctx.report()` for progress.
    ///
    /// Returns `StepOutcome::Skipped` when the job's parameters make the
    /// step unnecessary (not an error).
    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    ///
    /// Called only after `execute` returns `Success`.
    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Whether this step can be skipped depending on job parameters.
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
