use std::fs;

use aligner_engine::{ensure_output_dir, write_run_report, AtomicFileWriter, REPORT_FILENAME};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("alignments");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_and_is_atomic() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("clip.TextGrid", "tier one").unwrap();
    assert_eq!(first.file_name().unwrap(), "clip.TextGrid");
    assert_eq!(fs::read_to_string(&first).unwrap(), "tier one");

    // Replace existing
    let second = writer.write("clip.TextGrid", "tier two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "tier two");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("clip.TextGrid", "data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("clip.TextGrid").exists());
}

#[test]
fn run_report_summarizes_outcomes() {
    use std::path::PathBuf;

    use aligner_core::{Job, JobRecord, Outcome};

    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");

    let done_job = Job::new("a.wav");
    let error_job = Job::new("b.wav");
    let records = vec![
        JobRecord::new(
            &done_job,
            Outcome::Done,
            Some(out.join("a.TextGrid")),
        ),
        JobRecord::new(&error_job, Outcome::Error, None),
    ];
    let dirs = vec![out.clone()];

    let path = write_run_report(&out, &records, &dirs).unwrap();
    assert_eq!(path.file_name().unwrap(), REPORT_FILENAME);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report["done"], 1);
    assert_eq!(report["skipped"], 0);
    assert_eq!(report["errors"], 1);
    assert_eq!(report["records"].as_array().unwrap().len(), 2);
    assert_eq!(report["records"][0]["audio"], "a.wav");
    assert_eq!(report["records"][0]["status"], "done");
    assert_eq!(report["records"][1]["output_path"], serde_json::Value::Null);
}
