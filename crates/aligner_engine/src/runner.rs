use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use aligner_core::{
    ConfigError, Job, JobRecord, Outcome, ProgressTracker, RunConfig, RunState,
};

use crate::audio::{AudioSlicer, WavSlicer};
use crate::client::{build_request, AlignClient};
use crate::filename::output_path;
use crate::persist::AtomicFileWriter;
use crate::types::{AlignReply, ClientError, FailureKind};

/// How many times a watchdog trip may restart the batch before giving up.
const MAX_WATCHDOG_RESTARTS: usize = 3;
/// Pause between abandoning a stuck worker pool and re-walking the job list.
const RESTART_PAUSE: Duration = Duration::from_secs(3);

/// Point-in-time view of a run for status display. Safe to request from any
/// task; the driving loop is only briefly blocked on the state mutex.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub running: bool,
    pub finished: bool,
    pub cancelled: bool,
    pub done: usize,
    pub skipped: usize,
    pub errors: usize,
    pub active_workers: usize,
    pub total: usize,
    /// 1-based index of the job the driving loop last considered.
    pub index: usize,
    pub percentage_done: f64,
    pub eta: String,
}

/// Bounded-concurrency executor for a list of alignment jobs.
///
/// `start` validates the configuration, spawns a driving task and returns
/// immediately. Jobs are considered in submission order: each one is
/// resolved to its output path, skipped when the output already exists,
/// otherwise dispatched to the client as soon as a worker slot frees up.
/// Results land in completion order.
///
/// When the worker pool stays full past the watchdog timeout, the tracked
/// workers are abandoned (not cancelled; the underlying remote calls may
/// still finish and their records are kept) and the whole list is walked
/// again. The skip check makes the re-walk idempotent and doubles as the
/// retry for abandoned jobs. A worker that completed its write after being
/// abandoned is silently skipped on the next pass; that trade-off is
/// inherited from the watchdog design.
pub struct BatchRunner {
    state: Arc<Mutex<RunState>>,
    progress: Arc<Mutex<ProgressTracker>>,
    cancel: Arc<AtomicBool>,
    total: usize,
    driver: Option<JoinHandle<()>>,
}

impl BatchRunner {
    /// Begin executing `jobs` on a spawned driving task. Must be called
    /// from within a tokio runtime. Fails fast on invalid configuration;
    /// no job is considered in that case.
    pub fn start(
        jobs: Vec<Job>,
        config: RunConfig,
        client: Arc<dyn AlignClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let total = jobs.len();
        let state = Arc::new(Mutex::new(RunState::new()));
        let progress = Arc::new(Mutex::new(ProgressTracker::new(total)));
        let cancel = Arc::new(AtomicBool::new(false));

        state.lock().expect("lock run state").start_run();
        let driver = tokio::spawn(drive(
            jobs,
            Arc::new(config),
            client,
            Arc::clone(&state),
            Arc::clone(&progress),
            Arc::clone(&cancel),
        ));

        Ok(Self {
            state,
            progress,
            cancel,
            total,
            driver: Some(driver),
        })
    }

    /// Request cooperative cancellation. In-flight jobs finish; nothing new
    /// is dispatched once the driving loop observes the flag. Idempotent.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.state.lock().expect("lock run state").cancel();
    }

    pub fn status(&self) -> StatusSnapshot {
        let snapshot = self.state.lock().expect("lock run state").snapshot();
        let progress = self.progress.lock().expect("lock progress").clone();
        StatusSnapshot {
            running: snapshot.running,
            finished: snapshot.finished,
            cancelled: snapshot.cancelled,
            done: snapshot.done,
            skipped: snapshot.skipped,
            errors: snapshot.errors,
            active_workers: snapshot.active_workers,
            total: self.total,
            index: progress.index(),
            percentage_done: progress.percentage_done(),
            eta: progress.pretty_eta(),
        }
    }

    /// Successfully aligned jobs, in completion order.
    pub fn done(&self) -> Vec<JobRecord> {
        self.records(Outcome::Done)
    }

    /// Jobs whose output already existed, in completion order.
    pub fn skipped(&self) -> Vec<JobRecord> {
        self.records(Outcome::Skipped)
    }

    /// Failed jobs, in completion order.
    pub fn errors(&self) -> Vec<JobRecord> {
        self.records(Outcome::Error)
    }

    /// Every terminal outcome of the run, in completion order.
    pub fn info(&self) -> Vec<JobRecord> {
        self.state.lock().expect("lock run state").info().to_vec()
    }

    /// Distinct output directories touched so far.
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .expect("lock run state")
            .output_dirs()
            .iter()
            .cloned()
            .collect()
    }

    /// Wait for the driving task to finish.
    pub async fn join(mut self) {
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
    }

    fn records(&self, status: Outcome) -> Vec<JobRecord> {
        self.state.lock().expect("lock run state").by_outcome(status)
    }
}

enum PassOutcome {
    Completed,
    Cancelled,
    Stuck,
}

async fn drive(
    jobs: Vec<Job>,
    config: Arc<RunConfig>,
    client: Arc<dyn AlignClient>,
    state: Arc<Mutex<RunState>>,
    progress: Arc<Mutex<ProgressTracker>>,
    cancel: Arc<AtomicBool>,
) {
    let slicer: Arc<dyn AudioSlicer> = Arc::new(WavSlicer);
    let mut attempt = 0;

    let completed = loop {
        if attempt > 0 {
            warn!(
                "restarting batch after watchdog timeout (attempt {attempt}/{MAX_WATCHDOG_RESTARTS})"
            );
            sleep(RESTART_PAUSE).await;
        }

        match run_pass(&jobs, &config, &client, &slicer, &state, &progress, &cancel).await {
            PassOutcome::Completed => break true,
            PassOutcome::Cancelled => break false,
            PassOutcome::Stuck => {
                attempt += 1;
                if attempt > MAX_WATCHDOG_RESTARTS {
                    error!("watchdog restart budget exhausted, aborting batch");
                    break false;
                }
            }
        }
    };

    let mut guard = state.lock().expect("lock run state");
    guard.finish_run(completed);
    let snapshot = guard.snapshot();
    drop(guard);
    info!(
        "batch closed: {} done, {} skipped, {} errors (finished: {completed})",
        snapshot.done, snapshot.skipped, snapshot.errors
    );
}

/// One walk over the whole job list with a fresh worker pool.
async fn run_pass(
    jobs: &[Job],
    config: &Arc<RunConfig>,
    client: &Arc<dyn AlignClient>,
    slicer: &Arc<dyn AudioSlicer>,
    state: &Arc<Mutex<RunState>>,
    progress: &Arc<Mutex<ProgressTracker>>,
    cancel: &Arc<AtomicBool>,
) -> PassOutcome {
    let semaphore = Arc::new(Semaphore::new(config.max_workers));
    let mut handles: Vec<JoinHandle<()>> = Vec::new();
    let mut cancelled = false;

    for (index, job) in jobs.iter().enumerate() {
        progress.lock().expect("lock progress").update(index + 1);

        if cancel.load(Ordering::SeqCst) {
            info!("cancellation requested, leaving remaining jobs unprocessed");
            cancelled = true;
            break;
        }

        let dir = job
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        let target = output_path(&dir, &job.stem(), config.output_format, job.window);

        if target.exists() && !config.overwrite {
            debug!(
                "skipping {}: output {} already exists",
                job.audio.display(),
                target.display()
            );
            state
                .lock()
                .expect("lock run state")
                .record(JobRecord::new(job, Outcome::Skipped, Some(target)));
            continue;
        }

        let permit = match timeout(
            config.watchdog_timeout,
            Arc::clone(&semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return PassOutcome::Stuck,
            Err(_) => {
                abandon_workers(&mut handles);
                return PassOutcome::Stuck;
            }
        };

        state.lock().expect("lock run state").worker_started();
        let worker_job = job.clone();
        let worker_config = Arc::clone(config);
        let worker_client = Arc::clone(client);
        let worker_slicer = Arc::clone(slicer);
        let worker_state = Arc::clone(state);
        handles.push(tokio::spawn(async move {
            let record = execute_job(
                &worker_job,
                target,
                &worker_config,
                worker_client.as_ref(),
                worker_slicer.as_ref(),
            )
            .await;
            let mut guard = worker_state.lock().expect("lock run state");
            guard.record(record);
            guard.worker_finished();
            drop(guard);
            drop(permit);
        }));

        sleep(config.dispatch_delay).await;
    }

    // Drain: every slot must come back before the pass can settle.
    match timeout(
        config.watchdog_timeout,
        Arc::clone(&semaphore).acquire_many_owned(config.max_workers as u32),
    )
    .await
    {
        Ok(Ok(_permits)) => {
            if cancelled {
                PassOutcome::Cancelled
            } else {
                PassOutcome::Completed
            }
        }
        Ok(Err(_)) => PassOutcome::Stuck,
        Err(_) => {
            abandon_workers(&mut handles);
            if cancelled {
                // Restarting would dispatch nothing; settle as cancelled.
                PassOutcome::Cancelled
            } else {
                PassOutcome::Stuck
            }
        }
    }
}

/// Give up tracking the current workers. Handles are detached rather than
/// aborted: the underlying remote calls may still complete, and any record
/// they append later is kept. They stay counted as active until they
/// actually finish.
fn abandon_workers(handles: &mut Vec<JoinHandle<()>>) {
    warn!(
        "watchdog timeout: abandoning {} tracked workers",
        handles.len()
    );
    handles.clear();
}

/// Run one job to its terminal outcome. Every failure is job-level.
async fn execute_job(
    job: &Job,
    target: PathBuf,
    config: &RunConfig,
    client: &dyn AlignClient,
    slicer: &dyn AudioSlicer,
) -> JobRecord {
    match run_remote(job, &target, config, client, slicer).await {
        Ok(written) => {
            info!("aligned {} -> {}", job.audio.display(), written.display());
            JobRecord::new(job, Outcome::Done, Some(written))
        }
        Err(err) => {
            error!("alignment failed for {}: {err}", job.audio.display());
            JobRecord::new(job, Outcome::Error, None)
        }
    }
}

async fn run_remote(
    job: &Job,
    target: &Path,
    config: &RunConfig,
    client: &dyn AlignClient,
    slicer: &dyn AudioSlicer,
) -> Result<PathBuf, ClientError> {
    let request = build_request(job, config, slicer)?;
    let outcome = match client.run_pipeline(request).await? {
        AlignReply::Load(load) => {
            return Err(ClientError::new(
                FailureKind::Busy { load },
                "service reported load instead of a pipeline result",
            ));
        }
        AlignReply::Pipeline(outcome) => outcome,
    };

    if !outcome.success {
        let message = outcome
            .warnings
            .clone()
            .unwrap_or_else(|| "service reported failure".to_string());
        return Err(ClientError::new(
            FailureKind::Rejected {
                warnings: outcome.warnings,
            },
            message,
        ));
    }
    if let Some(warnings) = &outcome.warnings {
        warn!("service warnings for {}: {warnings}", job.audio.display());
    }

    let Some(link) = outcome.download_link else {
        return Err(ClientError::new(
            FailureKind::MissingArtifact,
            "success reply without a download link",
        ));
    };
    let artifact = client.fetch_artifact(&link).await?;

    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let filename = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    AtomicFileWriter::new(dir.to_path_buf())
        .write(&filename, &artifact)
        .map_err(|err| ClientError::new(FailureKind::Storage, err.to_string()))
}
