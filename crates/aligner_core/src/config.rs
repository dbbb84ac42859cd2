use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_WORKERS: usize = 9;
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(1200);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_workers must be at least 1 (got {0})")]
    InvalidWorkerBound(usize),
    #[error("unknown output format tag: {0}")]
    UnknownOutputFormat(String),
    #[error("unknown output symbol set: {0} (expected sampa, ipa, manner or place)")]
    UnknownSymbolSet(String),
    #[error("unknown processing pipeline: {0}")]
    UnknownPipeline(String),
}

/// Artifact format requested from the service; doubles as the output file
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    TextGrid,
    Par,
    Csv,
    Eaf,
    Tei,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::TextGrid => "TextGrid",
            OutputFormat::Par => "par",
            OutputFormat::Csv => "csv",
            OutputFormat::Eaf => "eaf",
            OutputFormat::Tei => "tei",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "TextGrid" => Ok(OutputFormat::TextGrid),
            "par" => Ok(OutputFormat::Par),
            "csv" => Ok(OutputFormat::Csv),
            "eaf" => Ok(OutputFormat::Eaf),
            "tei" => Ok(OutputFormat::Tei),
            other => Err(ConfigError::UnknownOutputFormat(other.to_string())),
        }
    }
}

/// Phonetic symbol set for the service output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolSet {
    Sampa,
    #[default]
    Ipa,
    Manner,
    Place,
}

impl SymbolSet {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolSet::Sampa => "sampa",
            SymbolSet::Ipa => "ipa",
            SymbolSet::Manner => "manner",
            SymbolSet::Place => "place",
        }
    }
}

impl FromStr for SymbolSet {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "sampa" => Ok(SymbolSet::Sampa),
            "ipa" => Ok(SymbolSet::Ipa),
            "manner" => Ok(SymbolSet::Manner),
            "place" => Ok(SymbolSet::Place),
            other => Err(ConfigError::UnknownSymbolSet(other.to_string())),
        }
    }
}

/// Processing pipeline selection on the service side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineKind {
    /// Grapheme-to-phoneme, alignment, then syllabification.
    #[default]
    G2pMausPho2syl,
    G2pMaus,
    Maus,
}

impl PipelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::G2pMausPho2syl => "G2P_MAUS_PHO2SYL",
            PipelineKind::G2pMaus => "G2P_MAUS",
            PipelineKind::Maus => "MAUS",
        }
    }
}

impl FromStr for PipelineKind {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "G2P_MAUS_PHO2SYL" => Ok(PipelineKind::G2pMausPho2syl),
            "G2P_MAUS" => Ok(PipelineKind::G2pMaus),
            "MAUS" => Ok(PipelineKind::Maus),
            other => Err(ConfigError::UnknownPipeline(other.to_string())),
        }
    }
}

/// Run-wide configuration for a batch.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Default directory for output artifacts; jobs may override it.
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub pipeline: PipelineKind,
    /// Ask the service to pre-segment the recording.
    pub preseg: bool,
    /// Default service language code for every job.
    pub language: String,
    /// Per-job language codes, keyed by the audio file stem.
    pub language_overrides: HashMap<String, String>,
    pub output_symbol: SymbolSet,
    /// Re-run jobs whose output already exists.
    pub overwrite: bool,
    /// Upper bound on concurrently in-flight jobs.
    pub max_workers: usize,
    /// Pause between consecutive dispatches, to spare the remote endpoint.
    pub dispatch_delay: Duration,
    /// How long a full worker pool may stay full before the run restarts.
    pub watchdog_timeout: Duration,
}

impl RunConfig {
    pub fn new(output_dir: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_format: OutputFormat::default(),
            pipeline: PipelineKind::default(),
            preseg: true,
            language: language.into(),
            language_overrides: HashMap::new(),
            output_symbol: SymbolSet::default(),
            overwrite: false,
            max_workers: DEFAULT_MAX_WORKERS,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
        }
    }

    /// Checked before the batch begins; a failure here means the batch
    /// never starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers < 1 {
            return Err(ConfigError::InvalidWorkerBound(self.max_workers));
        }
        Ok(())
    }

    /// Effective language for a job, honoring the override table.
    pub fn language_for(&self, stem: &str) -> &str {
        self.language_overrides
            .get(stem)
            .map(String::as_str)
            .unwrap_or(&self.language)
    }
}
