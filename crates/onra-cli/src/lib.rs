//! Shared plumbing for the four ONRA binaries: logging setup, config
//! loading and the exit-code convention.
//!
//! Exit codes: 0 success, 1 usage error, 2 topology/config load failure,
//! 3 solver tool not found, 4 internal consistency violation.

use anyhow::Result;
use onra_io::Params;
use onra_solver::SolverError;
use std::path::Path;
use std::process::exit;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

pub const EXIT_USAGE: i32 = 1;
pub const EXIT_LOAD: i32 = 2;
pub const EXIT_SOLVER_NOT_FOUND: i32 = 3;
pub const EXIT_CONSISTENCY: i32 = 4;

/// Install the global tracing subscriber. The `logger` config key can turn
/// logging off entirely.
pub fn init_tracing(level: Level, enabled: bool) {
    if !enabled {
        return;
    }
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}

/// Load `config/param.json`, exiting with the load code on failure.
pub fn load_params_or_exit(top_dir: &Path) -> Params {
    match Params::load(top_dir) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error loading param.json: {e:#}");
            exit(EXIT_LOAD);
        }
    }
}

/// Report a fatal error and exit with the matching code.
pub fn fail(phase_code: i32, err: anyhow::Error) -> ! {
    if err.downcast_ref::<SolverError>().map(|e| matches!(e, SolverError::NotFound { .. }))
        == Some(true)
    {
        error!("{err:#}");
        exit(EXIT_SOLVER_NOT_FOUND);
    }
    error!("{err:#}");
    eprintln!("{err:#}");
    exit(phase_code);
}

/// Run a fallible phase, mapping failure to the given exit code.
pub fn run_phase<T>(phase_code: i32, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => fail(phase_code, e),
    }
}
