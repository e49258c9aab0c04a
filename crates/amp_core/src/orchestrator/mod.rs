//! Pipeline orchestrator for running remix jobs.
//!
//! A job is a fixed sequence of steps sharing one `Context` (read-only
//! job inputs, tools, cancellation) and one `RunState` (paths produced by
//! earlier steps). The scratch directory created during setup is removed
//! when the run ends, whether it succeeded, failed or was cancelled.
//!
//! # Architecture
//!
//! ```text
//! QueueController (worker thread)
//!     └── Pipeline
//!         ├── Step: Setup
//!         ├── Step: Acquire
//!         ├── Step: Transcribe   (optional)
//!         ├── Step: Split
//!         ├── Step: Separate
//!         ├── Step: Mix
//!         ├── Step: Effects      (optional)
//!         └── Step: Export
//! ```
//!
//! # Example
//!
//! ```ignore
//! use amp_core::orchestrator::{create_standard_pipeline, Context, RunState};
//!
//! let ctx = Context::new(params, settings, "job_1", tools, cancel, logger);
//! let mut state = RunState::new("job-123");
//!
//! let result = create_standard_pipeline().run(&ctx, &mut state)?;
//! println!("Wrote: {:?}", result.outputs);
//! ```

mod cancel;
mod errors;
mod pipeline;
mod progress_bridge;
mod queue_processor;
mod scratch;
mod step;
pub mod steps;
mod types;

pub use cancel::CancelToken;
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{failure_message, Pipeline, PipelineRunResult};
pub use progress_bridge::{
    parse_percentage, SeparationProgress, SeparationTick, SEPARATION_END, SEPARATION_START,
};
pub use queue_processor::{
    JobOutcome, QueueController, QueueError, QueueEvent, QueueSummary, WORKER_THREAD_NAME,
};
pub use scratch::ScratchSpace;
pub use step::PipelineStep;
pub use steps::{
    AcquireStep, EffectsStep, ExportStep, MixStep, SeparateStep, SetupStep, SplitStep,
    TranscribeStep,
};
pub use types::{Context, ProgressCallback, RunState, StepOutcome};

/// Create the standard remix pipeline with all steps in order.
///
/// 1. Setup - resolve device, title and scratch directory
/// 2. Acquire - extract or download the full-length audio (and video)
/// 3. Transcribe - karaoke subtitles when lyrics are requested
/// 4. Split - cut the audio into fixed-length chunks
/// 5. Separate - run stem separation over every chunk
/// 6. Mix - apply stem volumes and join the chunks
/// 7. Effects - normalization, pitch and speed
/// 8. Export - write the video, remixed audio or stems
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(SetupStep::new())
        .with_step(AcquireStep::new())
        .with_step(TranscribeStep::new())
        .with_step(SplitStep::new())
        .with_step(SeparateStep::new())
        .with_step(MixStep::new())
        .with_step(EffectsStep::new())
        .with_step(ExportStep::new())
}
