//! Error types for solver invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the external solver.
///
/// Infeasibility is NOT an error: it is a regular outcome reported through
/// [`crate::driver::SolveOutcome::Infeasible`].
#[derive(Debug, Error)]
pub enum SolverError {
    /// The solver binary could not be found.
    #[error("solver binary not found: {binary}")]
    NotFound { binary: PathBuf },

    /// The solver process failed to start.
    #[error("failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// The solver exited non-zero without a parsable solution.
    #[error("solver process failed with exit code {exit_code}: {message}")]
    ProcessFailed { exit_code: i32, message: String },

    /// The problem is unbounded; the generated model is broken.
    #[error("solver reported an unbounded problem")]
    Unbounded,

    /// Wall-clock deadline expired; the process was killed.
    #[error("solver timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Solver output could not be interpreted.
    #[error("cannot parse solver output: {0}")]
    OutputParse(String),

    /// Generic IO error around the solver files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
