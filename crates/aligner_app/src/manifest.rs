//! JSON job-manifest loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use aligner_core::{Job, TimeWindow};

/// One job descriptor as written in the manifest file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    audio: PathBuf,
    #[serde(default)]
    text: Option<PathBuf>,
    #[serde(default)]
    inline_text: Option<String>,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
}

/// Load a batch manifest: a JSON array of job descriptors.
pub fn load_jobs(path: &Path) -> anyhow::Result<Vec<Job>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&content)
        .with_context(|| format!("manifest {} is not a JSON job list", path.display()))?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let mut job = Job::new(entry.audio);
            job.text = entry.text;
            job.inline_text = entry.inline_text;
            job.window = TimeWindow::new(entry.start, entry.end);
            job.output_dir = entry.output_dir;
            job
        })
        .collect())
}

/// Load a `{stem: language_code}` override table.
pub fn load_language_overrides(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read language overrides {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "language overrides {} are not a JSON string map",
            path.display()
        )
    })
}
