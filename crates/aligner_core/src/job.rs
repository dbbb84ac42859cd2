use std::path::PathBuf;

/// Optional time window within the source recording, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeWindow {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// True when neither bound is set and the whole recording is meant.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// One audio(+text) unit of work submitted to the alignment service.
/// Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Path to the audio recording.
    pub audio: PathBuf,
    /// Path to the orthographic transcript file.
    pub text: Option<PathBuf>,
    /// Transcript given inline; wins over `text` when both are set.
    pub inline_text: Option<String>,
    /// Window bounds; empty means the whole recording.
    pub window: TimeWindow,
    /// Per-job output directory, overriding the run-wide one.
    pub output_dir: Option<PathBuf>,
}

impl Job {
    pub fn new(audio: impl Into<PathBuf>) -> Self {
        Self {
            audio: audio.into(),
            text: None,
            inline_text: None,
            window: TimeWindow::default(),
            output_dir: None,
        }
    }

    /// Stem of the audio filename, used for language-override lookup and
    /// for naming the output artifact.
    pub fn stem(&self) -> String {
        self.audio
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
