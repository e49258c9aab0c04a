//! Recording stand-ins for the external tools.
//!
//! `StubTools` implements every tool trait by writing placeholder files
//! where the real tool would, and records each call as `op` or `op:detail`.

#![allow(dead_code)]

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tempfile::TempDir;
use url::Url;

use amp_core::config::Settings;
use amp_core::logging::{JobLogger, LogConfig};
use amp_core::models::{
    Device, DevicePreference, JobParams, ProgressEvent, Segment, SourceLocator, Stem,
    TranscriptionResult, WhisperModel, Word,
};
use amp_core::orchestrator::{CancelToken, Context};
use amp_core::tools::{
    filter_chain, AudioFilter, AudioFormat, CodecEngine, Downloader, MixInput, MuxRequest,
    Separator, ToolError, ToolResult, Toolset, Transcriber,
};

pub const MODEL: &str = "htdemucs";

pub struct StubTools {
    calls: Mutex<Vec<String>>,
    duration: Mutex<f64>,
    title: Mutex<String>,
    fail_on: Mutex<Option<String>>,
    fail_source_containing: Mutex<Option<String>>,
    cancel_on: Mutex<Option<(String, CancelToken)>>,
    pause_on: Mutex<Option<(String, Sender<()>, Receiver<()>)>>,
}

impl StubTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            duration: Mutex::new(601.0),
            title: Mutex::new("Remote Song".to_string()),
            fail_on: Mutex::new(None),
            fail_source_containing: Mutex::new(None),
            cancel_on: Mutex::new(None),
            pause_on: Mutex::new(None),
        })
    }

    pub fn toolset(self: &Arc<Self>) -> Toolset {
        Toolset {
            codec: self.clone(),
            downloader: self.clone(),
            transcriber: self.clone(),
            separator: self.clone(),
        }
    }

    pub fn set_duration(&self, seconds: f64) {
        *self.duration.lock() = seconds;
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    /// Fail every call to `op`.
    pub fn fail_on(&self, op: &str) {
        *self.fail_on.lock() = Some(op.to_string());
    }

    /// Fail audio extraction for sources whose path contains `marker`.
    pub fn fail_source_containing(&self, marker: &str) {
        *self.fail_source_containing.lock() = Some(marker.to_string());
    }

    /// Trip `token` when `op` is called. The call itself still completes.
    pub fn cancel_on(&self, op: &str, token: CancelToken) {
        *self.cancel_on.lock() = Some((op.to_string(), token));
    }

    /// Block every call to `op` until released.
    ///
    /// Returns a receiver signalled when a call enters the pause, and a
    /// sender that lets one paused call continue per message.
    pub fn pause_on(&self, op: &str) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        *self.pause_on.lock() = Some((op.to_string(), entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls whose name is `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn called(&self, op: &str) -> bool {
        self.count(op) > 0
    }

    fn hit(&self, op: &str, detail: &str) -> ToolResult<()> {
        let entry = if detail.is_empty() {
            op.to_string()
        } else {
            format!("{}:{}", op, detail)
        };
        self.calls.lock().push(entry);

        let pause = self
            .pause_on
            .lock()
            .as_ref()
            .filter(|(target, _, _)| target == op)
            .map(|(_, entered, release)| (entered.clone(), release.clone()));
        if let Some((entered, release)) = pause {
            let _ = entered.send(());
            let _ = release.recv();
        }

        if let Some((target, token)) = self.cancel_on.lock().as_ref() {
            if target == op {
                token.cancel();
            }
        }
        if self.fail_on.lock().as_deref() == Some(op) {
            return Err(ToolError::failed(
                op,
                format!("{} failed", op),
                "stub stderr line",
                Some(1),
            ));
        }
        Ok(())
    }
}

fn write_placeholder(path: &Path) -> ToolResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolError::io("creating stub output dir", e))?;
    }
    fs::write(path, b"stub").map_err(|e| ToolError::io("writing stub output", e))
}

impl CodecEngine for StubTools {
    fn extract_audio(&self, input: &Path, output: &Path, _format: &AudioFormat) -> ToolResult<()> {
        self.hit("extract_audio", "")?;
        if let Some(marker) = self.fail_source_containing.lock().as_deref() {
            if input.to_string_lossy().contains(marker) {
                return Err(ToolError::failed(
                    "ffmpeg",
                    "FFmpeg could not read the source.",
                    "Invalid data found when processing input",
                    Some(1),
                ));
            }
        }
        write_placeholder(output)
    }

    fn probe_duration(&self, _file: &Path) -> ToolResult<f64> {
        self.hit("probe_duration", "")?;
        Ok(*self.duration.lock())
    }

    fn slice(&self, _input: &Path, start: f64, length: f64, output: &Path) -> ToolResult<()> {
        self.hit("slice", &format!("{}+{}", start, length))?;
        write_placeholder(output)
    }

    fn mix(&self, inputs: &[MixInput], output: &Path) -> ToolResult<()> {
        self.hit("mix", &inputs.len().to_string())?;
        write_placeholder(output)
    }

    fn silence(&self, seconds: f64, _format: &AudioFormat, output: &Path) -> ToolResult<()> {
        self.hit("silence", &seconds.to_string())?;
        write_placeholder(output)
    }

    fn concatenate(
        &self,
        inputs: &[PathBuf],
        list_file: &Path,
        output: &Path,
        _codec: Option<&str>,
    ) -> ToolResult<()> {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.hit("concatenate", &format!("{}<{}", name, inputs.len()))?;
        write_placeholder(list_file)?;
        write_placeholder(output)
    }

    fn apply_filters(
        &self,
        _input: &Path,
        filters: &[AudioFilter],
        output: &Path,
        _codec: Option<&str>,
    ) -> ToolResult<()> {
        self.hit("apply_filters", &filter_chain(filters))?;
        write_placeholder(output)
    }

    fn mux(&self, request: &MuxRequest) -> ToolResult<()> {
        self.hit("mux", &request.video_filter_graph().unwrap_or_default())?;
        write_placeholder(&request.output)
    }
}

impl Downloader for StubTools {
    fn probe_title(&self, _url: &Url) -> ToolResult<String> {
        self.hit("probe_title", "")?;
        Ok(self.title.lock().clone())
    }

    fn download(
        &self,
        _url: &Url,
        selector: &str,
        dest_dir: &Path,
        file_stem: &str,
        on_progress: &mut dyn FnMut(f64) -> ControlFlow<()>,
    ) -> ToolResult<PathBuf> {
        self.hit("download", selector)?;
        for pct in [25.0, 100.0] {
            if on_progress(pct).is_break() {
                return Err(ToolError::interrupted("yt-dlp"));
            }
        }
        let ext = if selector.starts_with("bestvideo") {
            "mp4"
        } else {
            "m4a"
        };
        let path = dest_dir.join(format!("{}.{}", file_stem, ext));
        write_placeholder(&path)?;
        Ok(path)
    }
}

impl Transcriber for StubTools {
    fn transcribe(
        &self,
        _audio: &Path,
        model: WhisperModel,
        _device: Device,
    ) -> ToolResult<TranscriptionResult> {
        self.hit("transcribe", model.as_str())?;
        Ok(TranscriptionResult::new(vec![Segment {
            start: 0.5,
            end: 2.0,
            text: "la la".to_string(),
            words: vec![Word::new("la", 0.5, 1.0), Word::new("la", 1.0, 2.0)],
        }]))
    }
}

impl Separator for StubTools {
    fn model_name(&self) -> &str {
        MODEL
    }

    fn separate(
        &self,
        out_dir: &Path,
        _device: Device,
        inputs: &[PathBuf],
        on_line: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> ToolResult<()> {
        self.hit("separate", &inputs.len().to_string())?;
        for input in inputs {
            for line in [" 50%|#####     | 3/6", "100%|##########| 6/6"] {
                if on_line(line).is_break() {
                    return Err(ToolError::interrupted("demucs"));
                }
            }
            let chunk = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            for stem in Stem::ALL {
                let path = out_dir
                    .join(MODEL)
                    .join(&chunk)
                    .join(format!("{}.wav", stem.as_str()));
                write_placeholder(&path)?;
            }
        }
        Ok(())
    }
}

/// Temp workspace with a local source file and recorded progress.
pub struct Harness {
    pub dir: TempDir,
    pub tools: Arc<StubTools>,
    pub cancel: CancelToken,
    pub events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("input").join("song.mp4");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"video").unwrap();

        Self {
            dir,
            tools: StubTools::new(),
            cancel: CancelToken::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn source(&self) -> PathBuf {
        self.dir.path().join("input").join("song.mp4")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.paths.logs_folder = self.dir.path().join("logs").to_string_lossy().into_owned();
        settings.processing.device = DevicePreference::Cpu;
        settings.processing.chunk_duration_secs = 300.0;
        settings
    }

    /// Create another local source file under `input/`.
    pub fn make_source(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("input").join(name);
        fs::write(&path, b"video").unwrap();
        path
    }

    /// Video export of `source` with default options.
    pub fn params_for(&self, source: &Path) -> JobParams {
        JobParams::new(SourceLocator::Local(source.to_path_buf()), self.output_dir())
    }

    /// Video export of the local source with default options.
    pub fn params(&self) -> JobParams {
        JobParams::new(SourceLocator::Local(self.source()), self.output_dir())
    }

    pub fn context(&self, params: JobParams) -> Context {
        let logger = JobLogger::new(
            "test_job",
            self.dir.path().join("logs"),
            LogConfig::default(),
            None,
        )
        .unwrap();
        let events = Arc::clone(&self.events);
        Context::new(
            params,
            self.settings(),
            "test_job",
            self.tools.toolset(),
            self.cancel.clone(),
            Arc::new(logger),
        )
        .with_progress_callback(Box::new(move |event| events.lock().push(event)))
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn last_event(&self) -> Option<ProgressEvent> {
        self.events.lock().last().cloned()
    }

    /// Scratch directories left behind in the output directory.
    pub fn leftover_scratch(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.to_string_lossy().contains("_temp_"))
            .collect()
    }
}
