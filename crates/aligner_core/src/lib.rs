//! Aligner core: pure job model, run-state aggregate and progress math.
mod config;
mod job;
mod language;
mod outcome;
mod progress;
mod state;

pub use config::{
    ConfigError, OutputFormat, PipelineKind, RunConfig, SymbolSet, DEFAULT_DISPATCH_DELAY,
    DEFAULT_MAX_WORKERS, DEFAULT_WATCHDOG_TIMEOUT,
};
pub use job::{Job, TimeWindow};
pub use language::{language_code, LANGUAGES};
pub use outcome::{JobRecord, Outcome};
pub use progress::{format_dd_hh_mm_ss, ProgressTracker};
pub use state::{RunSnapshot, RunState};
