use std::fmt;
use std::path::PathBuf;

use chrono::{Local, Utc};

use crate::{Job, TimeWindow};

/// Terminal classification of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Remote call succeeded and the artifact was written.
    Done,
    /// Output already existed; no remote call was made.
    Skipped,
    /// Transport failure, service rejection, or local payload failure.
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Skipped => "skipped",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one terminal outcome. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub audio: PathBuf,
    pub window: TimeWindow,
    /// Resolved output path; None for error outcomes.
    pub output_path: Option<PathBuf>,
    pub status: Outcome,
    /// Human-readable local time of record creation.
    pub timestamp: String,
    /// Seconds since the Unix epoch at record creation.
    pub epoch_secs: i64,
}

impl JobRecord {
    pub fn new(job: &Job, status: Outcome, output_path: Option<PathBuf>) -> Self {
        Self {
            audio: job.audio.clone(),
            window: job.window,
            output_path,
            status,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            epoch_secs: Utc::now().timestamp(),
        }
    }
}
