use std::path::PathBuf;

use aligner_core::{Job, JobRecord, Outcome, RunState, TimeWindow};
use pretty_assertions::assert_eq;

fn record_for(state: &mut RunState, audio: &str, status: Outcome, output: Option<&str>) {
    let job = Job::new(audio);
    state.record(JobRecord::new(&job, status, output.map(PathBuf::from)));
}

#[test]
fn records_partition_into_outcome_views() {
    aligner_logging::initialize_for_tests();

    let mut state = RunState::new();
    state.start_run();
    record_for(&mut state, "a.wav", Outcome::Done, Some("out/a.TextGrid"));
    record_for(&mut state, "b.wav", Outcome::Skipped, Some("out/b.TextGrid"));
    record_for(&mut state, "c.wav", Outcome::Error, None);
    record_for(&mut state, "d.wav", Outcome::Done, Some("alt/d.TextGrid"));

    assert_eq!(state.done().len(), 2);
    assert_eq!(state.skipped().len(), 1);
    assert_eq!(state.errors().len(), 1);
    // Every terminal outcome shows up exactly once in the info superset.
    assert_eq!(
        state.done().len() + state.skipped().len() + state.errors().len(),
        state.info().len()
    );
}

#[test]
fn views_preserve_completion_order() {
    let mut state = RunState::new();
    record_for(&mut state, "late.wav", Outcome::Done, Some("out/late.TextGrid"));
    record_for(&mut state, "early.wav", Outcome::Done, Some("out/early.TextGrid"));

    let done: Vec<_> = state.done().iter().map(|r| r.audio.clone()).collect();
    assert_eq!(done, vec![PathBuf::from("late.wav"), PathBuf::from("early.wav")]);
}

#[test]
fn output_dirs_collect_distinct_parents() {
    let mut state = RunState::new();
    record_for(&mut state, "a.wav", Outcome::Done, Some("out/a.TextGrid"));
    record_for(&mut state, "b.wav", Outcome::Done, Some("out/b.TextGrid"));
    record_for(&mut state, "c.wav", Outcome::Done, Some("alt/c.TextGrid"));
    record_for(&mut state, "d.wav", Outcome::Error, None);

    let dirs: Vec<_> = state.output_dirs().iter().cloned().collect();
    assert_eq!(dirs, vec![PathBuf::from("alt"), PathBuf::from("out")]);
}

#[test]
fn snapshot_reflects_flags_and_counters() {
    let mut state = RunState::new();
    state.start_run();
    state.worker_started();
    state.worker_started();
    state.worker_finished();
    record_for(&mut state, "a.wav", Outcome::Done, Some("out/a.TextGrid"));

    let snapshot = state.snapshot();
    assert!(snapshot.running);
    assert!(!snapshot.finished);
    assert!(!snapshot.cancelled);
    assert_eq!(snapshot.active_workers, 1);
    assert_eq!(snapshot.done, 1);

    state.cancel();
    state.finish_run(false);
    let snapshot = state.snapshot();
    assert!(snapshot.cancelled);
    assert!(!snapshot.running);
    assert!(!snapshot.finished);
}

#[test]
fn finish_run_marks_completion_only_when_asked() {
    let mut state = RunState::new();
    state.start_run();
    state.finish_run(true);
    assert!(state.snapshot().finished);
}

#[test]
fn worker_counter_saturates_at_zero() {
    let mut state = RunState::new();
    state.worker_finished();
    assert_eq!(state.snapshot().active_workers, 0);
}

#[test]
fn windowed_records_keep_their_bounds() {
    let mut state = RunState::new();
    let mut job = Job::new("clip.wav");
    job.window = TimeWindow::new(Some(0.25), None);
    state.record(JobRecord::new(&job, Outcome::Done, Some(PathBuf::from("out/clip_s-250-ms.TextGrid"))));
    assert_eq!(state.done()[0].window.start, Some(0.25));
    assert_eq!(state.done()[0].window.end, None);
}
