//! FFmpeg-backed codec engine.

use std::fs;
use std::path::{Path, PathBuf};

use super::process::run_tool;
use super::{filter_chain, AudioFilter, AudioFormat, CodecEngine, MixInput, MuxRequest};
use super::{ToolError, ToolResult};

const TOOL: &str = "ffmpeg";

/// Codec engine that shells out to `ffmpeg` and `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Run ffmpeg with common flags; failures get `context` as message.
    fn run(&self, args: Vec<String>, context: &str) -> ToolResult<()> {
        let mut full = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        full.extend(args);

        run_tool(TOOL, &self.ffmpeg, &full)
            .map(|_| ())
            .map_err(|e| e.with_message(context))
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn secs(value: f64) -> String {
    format!("{:.3}", value)
}

fn pcm_args(format: &AudioFormat) -> Vec<String> {
    vec![
        "-acodec".to_string(),
        format.codec.clone(),
        "-ar".to_string(),
        format.sample_rate.to_string(),
        "-ac".to_string(),
        format.channels.to_string(),
    ]
}

/// Build the `-filter_complex` graph for a volume-weighted mix.
fn mix_graph(inputs: &[MixInput]) -> String {
    let mut graph = String::new();
    for (i, input) in inputs.iter().enumerate() {
        graph.push_str(&format!("[{}:a]volume={}[a{}];", i, input.volume, i));
    }
    for i in 0..inputs.len() {
        graph.push_str(&format!("[a{}]", i));
    }
    graph.push_str(&format!(
        "amix=inputs={}:duration=longest:normalize=0[out]",
        inputs.len()
    ));
    graph
}

/// Contents of a concat-demuxer list file, one `file '<path>'` per input.
pub fn concat_list_contents(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let posix = p.to_string_lossy().replace('\\', "/");
            format!("file '{}'\n", posix.replace('\'', "'\\''"))
        })
        .collect()
}

impl CodecEngine for FfmpegEngine {
    fn extract_audio(&self, input: &Path, output: &Path, format: &AudioFormat) -> ToolResult<()> {
        let mut args = vec!["-i".to_string(), path_arg(input), "-vn".to_string()];
        args.extend(pcm_args(format));
        args.push(path_arg(output));
        self.run(args, "FFmpeg failed during audio extraction.")
    }

    fn probe_duration(&self, file: &Path) -> ToolResult<f64> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path_arg(file),
        ];
        let output = run_tool("ffprobe", &self.ffprobe, &args)
            .map_err(|e| e.with_message("FFprobe could not read the media duration."))?;

        let text = String::from_utf8_lossy(&output.stdout);
        let value = text.trim();
        value
            .parse::<f64>()
            .map_err(|_| ToolError::parse("ffprobe", format!("invalid duration '{}'", value)))
    }

    fn slice(&self, input: &Path, start: f64, length: f64, output: &Path) -> ToolResult<()> {
        let args = vec![
            "-ss".to_string(),
            secs(start),
            "-t".to_string(),
            secs(length),
            "-i".to_string(),
            path_arg(input),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            path_arg(output),
        ];
        self.run(args, "FFmpeg failed while splitting audio.")
    }

    fn mix(&self, inputs: &[MixInput], output: &Path) -> ToolResult<()> {
        if inputs.is_empty() {
            return Err(ToolError::failed(TOOL, "Nothing to mix.", "", None));
        }

        let mut args = Vec::new();
        for input in inputs {
            args.push("-i".to_string());
            args.push(path_arg(&input.path));
        }
        args.push("-filter_complex".to_string());
        args.push(mix_graph(inputs));
        args.push("-map".to_string());
        args.push("[out]".to_string());
        args.push("-acodec".to_string());
        args.push("pcm_s16le".to_string());
        args.push(path_arg(output));
        self.run(args, "FFmpeg failed while mixing stems.")
    }

    fn silence(&self, seconds: f64, format: &AudioFormat, output: &Path) -> ToolResult<()> {
        let mut args = vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "anullsrc=r={}:cl={}",
                format.sample_rate,
                format.channel_layout()
            ),
            "-t".to_string(),
            secs(seconds),
        ];
        args.extend(pcm_args(format));
        args.push(path_arg(output));
        self.run(args, "FFmpeg failed while generating silence.")
    }

    fn concatenate(
        &self,
        inputs: &[PathBuf],
        list_file: &Path,
        output: &Path,
        codec: Option<&str>,
    ) -> ToolResult<()> {
        fs::write(list_file, concat_list_contents(inputs))
            .map_err(|e| ToolError::io("writing concat list", e))?;

        let mut args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            path_arg(list_file),
        ];
        if let Some(codec) = codec {
            args.push("-acodec".to_string());
            args.push(codec.to_string());
        }
        args.push(path_arg(output));
        self.run(args, "FFmpeg failed while joining audio.")
    }

    fn apply_filters(
        &self,
        input: &Path,
        filters: &[AudioFilter],
        output: &Path,
        codec: Option<&str>,
    ) -> ToolResult<()> {
        let mut args = vec!["-i".to_string(), path_arg(input)];
        if !filters.is_empty() {
            args.push("-af".to_string());
            args.push(filter_chain(filters));
        }
        if let Some(codec) = codec {
            args.push("-acodec".to_string());
            args.push(codec.to_string());
        }
        args.push(path_arg(output));
        self.run(args, "FFmpeg failed while applying audio effects.")
    }

    fn mux(&self, request: &MuxRequest) -> ToolResult<()> {
        let mut args = vec![
            "-i".to_string(),
            path_arg(&request.video),
            "-i".to_string(),
            path_arg(&request.audio),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
        ];
        if let Some(graph) = request.video_filter_graph() {
            args.push("-vf".to_string());
            args.push(graph);
        }
        args.extend([
            "-c:v".to_string(),
            request.video_codec.clone(),
            "-pix_fmt".to_string(),
            request.pixel_format.clone(),
            "-c:a".to_string(),
            request.audio_codec.clone(),
            "-b:a".to_string(),
            request.audio_bitrate.clone(),
            "-shortest".to_string(),
            path_arg(&request.output),
        ]);
        self.run(args, "FFmpeg failed during final video merge.")
    }
}
