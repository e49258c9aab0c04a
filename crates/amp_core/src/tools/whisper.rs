//! stable-ts transcription backend.
//!
//! Runs the `stable-ts` command-line tool, which writes a JSON result with
//! per-word timestamps, and parses that file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Device, TranscriptionResult, WhisperModel};

use super::process::run_tool;
use super::{ToolError, ToolResult, Transcriber};

const TOOL: &str = "stable-ts";

/// Transcriber that shells out to `stable-ts`.
#[derive(Debug, Clone)]
pub struct StableTsTranscriber {
    program: String,
}

impl StableTsTranscriber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(audio: &Path, output: &Path, model: WhisperModel, device: Device) -> Vec<String> {
        vec![
            audio.to_string_lossy().into_owned(),
            "--model".to_string(),
            model.as_str().to_string(),
            "--device".to_string(),
            device.as_str().to_string(),
            "--fp16".to_string(),
            if device.is_accelerated() { "True" } else { "False" }.to_string(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            "--overwrite".to_string(),
        ]
    }
}

impl Default for StableTsTranscriber {
    fn default() -> Self {
        Self::new("stable-ts")
    }
}

/// JSON result path next to the audio file.
fn result_path(audio: &Path) -> PathBuf {
    audio.with_extension("transcript.json")
}

/// Parse a stable-ts JSON result.
pub(crate) fn parse_result(json: &str) -> ToolResult<TranscriptionResult> {
    serde_json::from_str(json).map_err(|e| ToolError::parse(TOOL, e.to_string()))
}

impl Transcriber for StableTsTranscriber {
    fn transcribe(
        &self,
        audio: &Path,
        model: WhisperModel,
        device: Device,
    ) -> ToolResult<TranscriptionResult> {
        let output = result_path(audio);
        let args = Self::build_args(audio, &output, model, device);

        run_tool(TOOL, &self.program, &args)
            .map_err(|e| e.with_message(format!("Transcription with '{}' failed.", model)))?;

        let json =
            fs::read_to_string(&output).map_err(|e| ToolError::io("reading transcription", e))?;
        let result = parse_result(&json)?;

        tracing::debug!(
            "Transcribed {} segments, {} words",
            result.segments.len(),
            result.word_count()
        );
        Ok(result)
    }
}
