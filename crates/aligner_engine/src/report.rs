use std::path::{Path, PathBuf};

use serde_json::json;

use aligner_core::{JobRecord, Outcome};

use crate::persist::{AtomicFileWriter, PersistError};

pub const REPORT_FILENAME: &str = "alignment_report.json";

/// Write a JSON summary of a run into `output_dir`.
///
/// Records are listed in completion order, with the same fields the result
/// accessors expose, so a run can be audited after the process exits.
pub fn write_run_report(
    output_dir: &Path,
    records: &[JobRecord],
    dirs_touched: &[PathBuf],
) -> Result<PathBuf, PersistError> {
    let count = |status: Outcome| records.iter().filter(|r| r.status == status).count();
    let report = json!({
        "done": count(Outcome::Done),
        "skipped": count(Outcome::Skipped),
        "errors": count(Outcome::Error),
        "output_dirs": dirs_touched
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>(),
        "records": records
            .iter()
            .map(|record| {
                json!({
                    "audio": record.audio.display().to_string(),
                    "start": record.window.start,
                    "end": record.window.end,
                    "output_path": record
                        .output_path
                        .as_ref()
                        .map(|path| path.display().to_string()),
                    "status": record.status.as_str(),
                    "timestamp": record.timestamp,
                    "epoch_time": record.epoch_secs,
                })
            })
            .collect::<Vec<_>>(),
    });

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    writer.write(REPORT_FILENAME, &report.to_string())
}
