//! Demucs source separation backend.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::models::Device;

use super::process::{stream_output, OutputStream, StreamEnd};
use super::{Separator, ToolError, ToolResult};

const TOOL: &str = "demucs";

/// Separator that runs `python -m demucs` as a subprocess.
///
/// Demucs reports progress as tqdm bars on stderr; those lines are passed
/// through to the caller untouched.
#[derive(Debug, Clone)]
pub struct DemucsSeparator {
    python: String,
    model: String,
}

impl DemucsSeparator {
    pub fn new(python: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            model: model.into(),
        }
    }

    fn build_args(&self, out_dir: &Path, device: Device, inputs: &[PathBuf]) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            "demucs".to_string(),
            "-n".to_string(),
            self.model.clone(),
            "--out".to_string(),
            out_dir.to_string_lossy().into_owned(),
            "--device".to_string(),
            device.as_str().to_string(),
        ];
        args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
        args
    }
}

impl Default for DemucsSeparator {
    fn default() -> Self {
        Self::new("python3", "htdemucs")
    }
}

impl Separator for DemucsSeparator {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn separate(
        &self,
        out_dir: &Path,
        device: Device,
        inputs: &[PathBuf],
        on_line: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> ToolResult<()> {
        let args = self.build_args(out_dir, device, inputs);

        match stream_output(TOOL, &self.python, &args, OutputStream::Stderr, on_line)? {
            StreamEnd::Stopped => Err(ToolError::interrupted(TOOL)),
            StreamEnd::Exited { success: true, .. } => Ok(()),
            StreamEnd::Exited { code, tail, .. } => Err(ToolError::failed(
                TOOL,
                "Demucs failed.",
                tail.join("\n"),
                code,
            )),
        }
    }
}
