//! Command-line front end for the alignment batch runner.

mod manifest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};

use aligner_core::{language_code, Job, RunConfig, TimeWindow, DEFAULT_MAX_WORKERS, LANGUAGES};
use aligner_engine::{
    build_request, ensure_output_dir, output_path, write_run_report, AlignClient, AlignReply,
    AtomicFileWriter, BatchRunner, ClientSettings, HttpAlignClient, WavSlicer,
};
use aligner_logging::LogDestination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogChoice {
    Terminal,
    File,
    Both,
}

impl From<LogChoice> for LogDestination {
    fn from(choice: LogChoice) -> Self {
        match choice {
            LogChoice::Terminal => LogDestination::Terminal,
            LogChoice::File => LogDestination::File,
            LogChoice::Both => LogDestination::Both,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "aligner",
    version,
    about = "Batch client for a forced-alignment web service"
)]
struct Args {
    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogChoice::Terminal, global = true)]
    log: LogChoice,

    #[command(subcommand)]
    command: Command,
}

/// Service-side options shared by both alignment commands.
#[derive(clap::Args, Debug)]
struct ServiceOpts {
    /// Output artifact format tag.
    #[arg(long, default_value = "TextGrid")]
    output_format: String,

    /// Processing pipeline selection.
    #[arg(long, default_value = "G2P_MAUS_PHO2SYL")]
    pipe: String,

    /// Disable service-side pre-segmentation.
    #[arg(long)]
    no_preseg: bool,

    /// Phonetic symbol set for the output.
    #[arg(long, default_value = "ipa")]
    symbol: String,

    /// Alternative service endpoint.
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(clap::Args, Debug)]
struct AlignOpts {
    /// Path to the audio recording.
    audio: PathBuf,

    /// Path to the transcript file.
    text: PathBuf,

    /// Directory for the output artifact.
    output_dir: PathBuf,

    /// Service language code (see `aligner languages`).
    language: String,

    /// Window start in seconds.
    #[arg(long)]
    start: Option<f64>,

    /// Window end in seconds.
    #[arg(long)]
    end: Option<f64>,

    /// Replace the output if it already exists.
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    service: ServiceOpts,
}

#[derive(clap::Args, Debug)]
struct RunOpts {
    /// Path to the JSON job manifest.
    manifest: PathBuf,

    /// Default directory for output artifacts.
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Default service language code for every job.
    #[arg(short, long)]
    language: String,

    /// Re-run jobs whose output already exists.
    #[arg(long)]
    overwrite: bool,

    /// Upper bound on concurrently in-flight jobs.
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Seconds to pause between consecutive dispatches.
    #[arg(long, default_value_t = 1.0)]
    dispatch_delay_secs: f64,

    /// Seconds a full worker pool may stay stuck before the batch restarts.
    #[arg(long, default_value_t = 1200)]
    watchdog_secs: u64,

    /// JSON file mapping audio stems to language codes.
    #[arg(long)]
    language_overrides: Option<PathBuf>,

    /// Skip writing alignment_report.json.
    #[arg(long)]
    no_report: bool,

    #[command(flatten)]
    service: ServiceOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align a single audio/text pair and write the artifact.
    Align(AlignOpts),

    /// Run a batch of jobs from a JSON manifest.
    Run(RunOpts),

    /// List known language names and their service codes.
    Languages,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    aligner_logging::initialize(args.log.into());

    let result = match args.command {
        Command::Align(opts) => align_single(opts).await,
        Command::Run(opts) => run_batch(opts).await,
        Command::Languages => {
            list_languages();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_batch(opts: RunOpts) -> anyhow::Result<()> {
    let jobs = manifest::load_jobs(&opts.manifest)?;
    anyhow::ensure!(
        !jobs.is_empty(),
        "manifest {} contains no jobs",
        opts.manifest.display()
    );

    let mut config = build_config(
        opts.output_dir.clone(),
        opts.language,
        &opts.service,
        opts.overwrite,
    )?;
    config.max_workers = opts.max_workers;
    config.dispatch_delay = Duration::from_secs_f64(opts.dispatch_delay_secs);
    config.watchdog_timeout = Duration::from_secs(opts.watchdog_secs);
    if let Some(path) = &opts.language_overrides {
        config.language_overrides = manifest::load_language_overrides(path)?;
    }

    ensure_output_dir(&opts.output_dir)?;
    let client: Arc<dyn AlignClient> =
        Arc::new(HttpAlignClient::new(client_settings(&opts.service))?);

    info!(
        "starting batch of {} jobs ({} workers max)",
        jobs.len(),
        config.max_workers
    );
    let runner = BatchRunner::start(jobs, config, client)?;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received, letting in-flight jobs finish");
                runner.stop();
            }
        }
        let status = runner.status();
        info!(
            "progress {:.1}% ({}/{}) done={} skipped={} errors={} active={} eta={}",
            status.percentage_done,
            status.index,
            status.total,
            status.done,
            status.skipped,
            status.errors,
            status.active_workers,
            status.eta
        );
        if !status.running {
            break;
        }
    }

    let status = runner.status();
    let records = runner.info();
    let dirs = runner.output_dirs();
    runner.join().await;

    if !opts.no_report {
        let report = write_run_report(&opts.output_dir, &records, &dirs)?;
        info!("run report written to {}", report.display());
    }

    println!(
        "done: {}  skipped: {}  errors: {}{}",
        status.done,
        status.skipped,
        status.errors,
        if status.finished {
            ""
        } else {
            "  (batch did not finish)"
        }
    );
    // A user cancellation is a clean exit; a watchdog abort is not.
    if !status.finished && !status.cancelled {
        anyhow::bail!("batch aborted before completing the job list");
    }
    anyhow::ensure!(
        status.errors == 0,
        "batch closed with {} job errors",
        status.errors
    );
    Ok(())
}

async fn align_single(opts: AlignOpts) -> anyhow::Result<()> {
    let config = build_config(
        opts.output_dir.clone(),
        opts.language,
        &opts.service,
        opts.overwrite,
    )?;
    let mut job = Job::new(opts.audio);
    job.text = Some(opts.text);
    job.window = TimeWindow::new(opts.start, opts.end);

    let target = output_path(&opts.output_dir, &job.stem(), config.output_format, job.window);
    if target.exists() && !config.overwrite {
        anyhow::bail!(
            "output {} already exists (use --overwrite to replace it)",
            target.display()
        );
    }
    ensure_output_dir(&opts.output_dir)?;

    let client = HttpAlignClient::new(client_settings(&opts.service))?;
    let request = build_request(&job, &config, &WavSlicer)?;
    let outcome = match client.run_pipeline(request).await? {
        AlignReply::Load(load) => {
            anyhow::bail!("service is busy (load {load}), try again later")
        }
        AlignReply::Pipeline(outcome) => outcome,
    };
    anyhow::ensure!(
        outcome.success,
        "service rejected the job: {}",
        outcome.warnings.as_deref().unwrap_or("no details")
    );
    if let Some(warnings) = &outcome.warnings {
        warn!("service warnings: {warnings}");
    }
    let link = outcome
        .download_link
        .context("success reply without a download link")?;
    let artifact = client.fetch_artifact(&link).await?;

    let filename = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("resolved output path has no filename")?;
    let written = AtomicFileWriter::new(opts.output_dir.clone()).write(&filename, &artifact)?;
    println!("saved: {}", written.display());
    Ok(())
}

fn list_languages() {
    for (name, code) in LANGUAGES {
        println!("{code:12} {name}");
    }
}

/// Accept either a service language code or a human language name.
fn resolve_language(input: &str) -> String {
    language_code(input)
        .map(str::to_string)
        .unwrap_or_else(|| input.to_string())
}

fn build_config(
    output_dir: PathBuf,
    language: String,
    service: &ServiceOpts,
    overwrite: bool,
) -> anyhow::Result<RunConfig> {
    let mut config = RunConfig::new(output_dir, resolve_language(&language));
    config.output_format = service.output_format.parse()?;
    config.pipeline = service.pipe.parse()?;
    config.preseg = !service.no_preseg;
    config.output_symbol = service.symbol.parse()?;
    config.overwrite = overwrite;
    Ok(config)
}

fn client_settings(service: &ServiceOpts) -> ClientSettings {
    match &service.endpoint {
        Some(endpoint) => ClientSettings {
            endpoint: endpoint.clone(),
            ..ClientSettings::default()
        },
        None => ClientSettings::default(),
    }
}
