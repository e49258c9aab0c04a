mod common;

use amp_core::models::{ExportFormat, ExportMode, SourceLocator, Stem, StemSelection};
use std::fs;

use amp_core::orchestrator::{
    create_standard_pipeline, Context, Pipeline, PipelineStep, RunState, ScratchSpace, StepError,
    StepOutcome, StepResult,
};

use common::Harness;

#[test]
fn video_run_executes_core_stages_in_order() {
    let h = Harness::new();
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert_eq!(
        result.steps_completed,
        vec!["Setup", "Acquire", "Split", "Separate", "Mix", "Export"]
    );
    assert_eq!(result.steps_skipped, vec!["Transcribe", "Effects"]);

    let output = h.output_dir().join("song_Remixed.mp4");
    assert_eq!(result.outputs, vec![output.clone()]);
    assert!(output.exists());

    let calls = h.tools.calls();
    let first = |op: &str| calls.iter().position(|c| c.starts_with(op)).unwrap();
    assert!(first("extract_audio") < first("slice"));
    assert!(first("slice") < first("separate"));
    assert!(first("separate") < first("mix"));
    assert!(first("mix") < first("mux"));
    assert!(!h.tools.called("download"));
    assert!(!h.tools.called("transcribe"));
    assert!(calls.contains(&"mux".to_string()));
}

#[test]
fn long_audio_is_split_into_three_chunks() {
    let h = Harness::new();
    h.tools.set_duration(601.0);
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    create_standard_pipeline().run(&ctx, &mut state).unwrap();

    let slices: Vec<String> = h
        .tools
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("slice"))
        .collect();
    assert_eq!(slices, vec!["slice:0+300", "slice:300+300", "slice:600+1"]);
    assert!(h.tools.calls().contains(&"separate:3".to_string()));
    assert_eq!(h.tools.count("mix"), 3);
    assert!(h
        .tools
        .calls()
        .contains(&"concatenate:mixed_audio.wav<3".to_string()));
}

#[test]
fn scratch_is_removed_after_success() {
    let h = Harness::new();
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert!(h.leftover_scratch().is_empty());
    assert!(state.scratch.is_none());
    let last = h.last_event().unwrap();
    assert_eq!(last.message, "Cleanup complete.");
    assert_eq!(last.percent, 100.0);
}

#[test]
fn effects_and_lyrics_feed_the_final_video() {
    let h = Harness::new();
    let mut params = h.params();
    params.generate_lyrics = true;
    params.normalize = true;
    params.speed = 1.5;
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert!(result.steps_skipped.is_empty());
    assert_eq!(h.tools.count("transcribe"), 1);
    assert!(h
        .tools
        .calls()
        .contains(&"apply_filters:loudnorm,atempo=1.5".to_string()));

    let mux = h
        .tools
        .calls()
        .into_iter()
        .find(|c| c.starts_with("mux"))
        .unwrap();
    assert!(mux.contains("setpts="));
    assert!(mux.contains("ass="));
    assert!(h.events.lock().iter().any(|e| e.is_indeterminate()));
}

#[test]
fn lyrics_are_ignored_for_audio_exports() {
    let h = Harness::new();
    let mut params = h.params();
    params.generate_lyrics = true;
    params.export_mode = ExportMode::AudioOnly;
    params.export_format = ExportFormat::Flac;
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert!(!h.tools.called("transcribe"));
    assert!(!h.tools.called("mux"));
    assert!(result.steps_skipped.contains(&"Transcribe".to_string()));

    let output = h.output_dir().join("song_Remixed.flac");
    assert_eq!(result.outputs, vec![output.clone()]);
    assert!(output.exists());
    assert!(h.messages().iter().any(|m| m.starts_with("Success! Audio saved to")));
}

#[test]
fn muted_stems_are_replaced_with_silence() {
    let h = Harness::new();
    let mut params = h.params();
    for stem in Stem::ALL {
        params.stem_volumes.set(stem, 0.0);
    }
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert_eq!(h.tools.count("mix"), 0);
    assert_eq!(h.tools.count("silence"), 3);
    assert!(h.tools.calls().contains(&"silence:300".to_string()));
}

#[test]
fn stems_only_exports_exactly_the_selected_stems() {
    let h = Harness::new();
    let mut params = h.params();
    params.export_mode = ExportMode::StemsOnly;
    params.export_format = ExportFormat::Wav;
    params.normalize = true;
    let mut selection = StemSelection::none();
    selection.set(Stem::Vocals, true);
    selection.set(Stem::Bass, true);
    params.stems_to_export = selection;
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

    let stems_dir = h.output_dir().join("song_stems");
    assert_eq!(
        result.outputs,
        vec![
            stems_dir.join("song_vocals.wav"),
            stems_dir.join("song_bass.wav"),
        ]
    );
    assert!(!stems_dir.join("song_drums.wav").exists());
    assert!(!stems_dir.join("song_other.wav").exists());
    assert!(!h.tools.called("apply_filters"));
    assert!(!h.tools.called("mux"));
    assert!(result.steps_skipped.contains(&"Effects".to_string()));
}

#[test]
fn remote_audio_export_skips_video_download() {
    let h = Harness::new();
    h.tools.set_title("Remote: Song?");
    let mut params = h.params();
    params.source = SourceLocator::parse("https://www.youtube.com/watch?v=abc");
    params.export_mode = ExportMode::AudioOnly;
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

    let downloads: Vec<String> = h
        .tools
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("download"))
        .collect();
    assert_eq!(downloads, vec!["download:bestaudio/best"]);
    assert_eq!(
        result.outputs,
        vec![h.output_dir().join("Remote Song_Remixed.mp3")]
    );
    assert!(h.messages().iter().any(|m| m.starts_with("Downloading:")));
}

#[test]
fn remote_video_export_downloads_both_streams() {
    let h = Harness::new();
    let mut params = h.params();
    params.source = SourceLocator::parse("https://youtu.be/abc");
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    create_standard_pipeline().run(&ctx, &mut state).unwrap();

    assert_eq!(h.tools.count("download"), 2);
    assert!(h.tools.called("mux"));
}

#[test]
fn tool_failure_reports_error_and_cleans_up() {
    let h = Harness::new();
    h.tools.fail_on("mix");
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    let err = create_standard_pipeline()
        .run(&ctx, &mut state)
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert_eq!(err.summary(), "mix failed");
    assert_eq!(err.detail(), Some("stub stderr line"));
    assert!(h
        .messages()
        .contains(&"Processing error: mix failed\nDetails:\nstub stderr line".to_string()));
    assert_eq!(h.last_event().unwrap().message, "Cleanup complete.");
    assert!(h.leftover_scratch().is_empty());
    assert!(!h.tools.called("concatenate"));
}

#[test]
fn missing_local_source_fails_before_any_work() {
    let h = Harness::new();
    let mut params = h.params();
    params.source = SourceLocator::Local(h.dir.path().join("missing.mp4"));
    let ctx = h.context(params);
    let mut state = RunState::new("job-1");

    let err = create_standard_pipeline()
        .run(&ctx, &mut state)
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(h.tools.calls().is_empty());
    assert!(h.leftover_scratch().is_empty());
    assert!(h.messages()[0].starts_with("Processing error:"));
}

#[test]
fn cancellation_before_a_stage_prevents_its_work() {
    let h = Harness::new();
    h.tools.cancel_on("extract_audio", h.cancel.clone());
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    let err = create_standard_pipeline()
        .run(&ctx, &mut state)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!h.tools.called("probe_duration"));
    assert!(!h.tools.called("slice"));
    assert!(h
        .messages()
        .contains(&"Processing was cancelled by the user.".to_string()));
    assert!(h.leftover_scratch().is_empty());
    assert!(!h.output_dir().join("song_Remixed.mp4").exists());
}

#[test]
fn cancellation_during_separation_stops_the_tool() {
    let h = Harness::new();
    h.tools.cancel_on("separate", h.cancel.clone());
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    let err = create_standard_pipeline()
        .run(&ctx, &mut state)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!h.tools.called("mix"));
    assert!(!h.tools.called("silence"));
    assert!(h.leftover_scratch().is_empty());
}

#[test]
fn cancellation_between_chunks_stops_splitting() {
    let h = Harness::new();
    h.tools.cancel_on("slice", h.cancel.clone());
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    let err = create_standard_pipeline()
        .run(&ctx, &mut state)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(h.tools.count("slice"), 1);
    assert!(!h.tools.called("separate"));
}

#[test]
fn separation_progress_stays_in_its_band() {
    let h = Harness::new();
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");

    create_standard_pipeline().run(&ctx, &mut state).unwrap();

    let events = h.events.lock();
    let separation: Vec<f64> = events
        .iter()
        .filter(|e| e.message.starts_with("AI Separation (Chunk"))
        .map(|e| e.percent)
        .collect();
    assert!(!separation.is_empty());
    assert!(separation.iter().all(|p| (30.0..=70.0).contains(p)));
    assert!(events
        .iter()
        .any(|e| e.message == "AI Separation (Chunk 3/3) - 100%"));
}

/// Creates scratch space, then puts a plain file where the directory was
/// so removal fails with "not a directory".
struct UnremovableScratchStep {
    fail: bool,
}

impl PipelineStep for UnremovableScratchStep {
    fn name(&self) -> &str {
        "Setup"
    }

    fn validate_input(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let scratch = ScratchSpace::create(&ctx.params.output_dir, "song")
            .map_err(|e| StepError::io_error("create scratch", e))?;
        fs::remove_dir(scratch.path()).map_err(|e| StepError::io_error("remove dir", e))?;
        fs::write(scratch.path(), b"x").map_err(|e| StepError::io_error("write file", e))?;
        state.scratch = Some(scratch);

        if self.fail {
            return Err(StepError::other("setup broke"));
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
        Ok(())
    }
}

#[cfg(unix)]
#[test]
fn cleanup_failure_is_a_warning_after_success() {
    let h = Harness::new();
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");
    let pipeline = Pipeline::new().with_step(UnremovableScratchStep { fail: false });

    let result = pipeline.run(&ctx, &mut state).unwrap();

    assert_eq!(result.steps_completed, vec!["Setup"]);
    let last = h.last_event().unwrap();
    assert!(
        last.message
            .starts_with("Warning: could not remove temp directory:"),
        "unexpected last event {:?}",
        last.message
    );
    assert_eq!(last.percent, 100.0);
    assert!(!h.messages().contains(&"Cleanup complete.".to_string()));
}

#[cfg(unix)]
#[test]
fn cleanup_failure_keeps_the_original_error() {
    let h = Harness::new();
    let ctx = h.context(h.params());
    let mut state = RunState::new("job-1");
    let pipeline = Pipeline::new().with_step(UnremovableScratchStep { fail: true });

    let err = pipeline.run(&ctx, &mut state).unwrap_err();

    assert!(!err.is_cancelled());
    assert_eq!(err.summary(), "setup broke");
    let messages = h.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], "Processing error: setup broke");
    assert!(messages[1].starts_with("Warning: could not remove temp directory:"));
    assert_eq!(h.last_event().unwrap().percent, 100.0);
}
