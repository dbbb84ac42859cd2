use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::{JobRecord, Outcome};

/// Mutable aggregate for one batch run.
///
/// Owned by the batch runner behind a single mutation gate; everything here
/// is a plain synchronous mutator so the gate stays in one place. Records
/// arrive in completion order, not submission order.
#[derive(Debug, Default)]
pub struct RunState {
    info: Vec<JobRecord>,
    output_dirs: BTreeSet<PathBuf>,
    cancelled: bool,
    running: bool,
    finished: bool,
    active_workers: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one terminal outcome and note the directory it touched.
    pub fn record(&mut self, record: JobRecord) {
        if let Some(dir) = record.output_path.as_ref().and_then(|path| path.parent()) {
            self.output_dirs.insert(dir.to_path_buf());
        }
        self.info.push(record);
    }

    pub fn start_run(&mut self) {
        self.running = true;
        self.finished = false;
    }

    /// Close the run. `completed` is true only when the driving loop walked
    /// the whole job list; cancellation and watchdog aborts pass false.
    pub fn finish_run(&mut self, completed: bool) {
        self.running = false;
        self.finished = completed;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn worker_started(&mut self) {
        self.active_workers += 1;
    }

    pub fn worker_finished(&mut self) {
        self.active_workers = self.active_workers.saturating_sub(1);
    }

    /// All records in completion order.
    pub fn info(&self) -> &[JobRecord] {
        &self.info
    }

    /// Records with the given outcome, in completion order.
    pub fn by_outcome(&self, status: Outcome) -> Vec<JobRecord> {
        self.info
            .iter()
            .filter(|record| record.status == status)
            .cloned()
            .collect()
    }

    pub fn done(&self) -> Vec<JobRecord> {
        self.by_outcome(Outcome::Done)
    }

    pub fn skipped(&self) -> Vec<JobRecord> {
        self.by_outcome(Outcome::Skipped)
    }

    pub fn errors(&self) -> Vec<JobRecord> {
        self.by_outcome(Outcome::Error)
    }

    /// Distinct output directories touched by this run.
    pub fn output_dirs(&self) -> &BTreeSet<PathBuf> {
        &self.output_dirs
    }

    /// Cheap copy for status polling; does not clone the record list.
    pub fn snapshot(&self) -> RunSnapshot {
        let count =
            |status: Outcome| self.info.iter().filter(|r| r.status == status).count();
        RunSnapshot {
            done: count(Outcome::Done),
            skipped: count(Outcome::Skipped),
            errors: count(Outcome::Error),
            cancelled: self.cancelled,
            running: self.running,
            finished: self.finished,
            active_workers: self.active_workers,
        }
    }
}

/// Point-in-time counters and flags for status display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSnapshot {
    pub done: usize,
    pub skipped: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub running: bool,
    pub finished: bool,
    pub active_workers: usize,
}
