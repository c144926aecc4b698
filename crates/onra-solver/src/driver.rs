//! Subprocess management for glpsol.
//!
//! Spawns the solver, enforces a wall-clock deadline on top of the solver's
//! own `--tmlim`, and turns the captured output into a [`SolveOutcome`].

use crate::error::{SolverError, SolverResult};
use crate::solution::{self, Solution, StdoutStatus};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Default solver binary name, resolved through `PATH`.
pub const GLPK_SOLVER: &str = "glpsol";

/// Grace added to `--tmlim` before the process is killed from outside.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// Result of one solver run.
#[derive(Debug)]
pub enum SolveOutcome {
    /// An optimal solution was parsed.
    Optimal(Solution),
    /// The problem has no feasible solution. A regular, client-visible
    /// outcome: the engine advances to the next channel trial.
    Infeasible,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Optimal(s) => Some(s),
            SolveOutcome::Infeasible => None,
        }
    }
}

/// Driver for one glpsol installation.
#[derive(Debug, Clone)]
pub struct GlpsolDriver {
    binary: PathBuf,
    /// Seconds passed to `--tmlim`.
    pub tmlim_secs: u64,
}

impl GlpsolDriver {
    pub fn new(tmlim_secs: u64) -> GlpsolDriver {
        GlpsolDriver {
            binary: PathBuf::from(GLPK_SOLVER),
            tmlim_secs,
        }
    }

    pub fn with_binary(binary: &Path, tmlim_secs: u64) -> GlpsolDriver {
        GlpsolDriver {
            binary: binary.to_path_buf(),
            tmlim_secs,
        }
    }

    /// Run `glpsol --model <model> --data <data> --output <sol_file>`,
    /// capture stdout/stderr, and interpret the result.
    ///
    /// `dump_stdout` logs the raw solver output instead of only the decision
    /// lines.
    pub fn solve(
        &self,
        model_file: &Path,
        data_file: &Path,
        sol_file: &Path,
        dump_stdout: bool,
    ) -> SolverResult<SolveOutcome> {
        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(model_file)
            .arg("--data")
            .arg(data_file)
            .arg("--output")
            .arg(sol_file)
            .arg("--tmlim")
            .arg(self.tmlim_secs.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SolverError::NotFound {
                        binary: self.binary.clone(),
                    }
                } else {
                    SolverError::ProcessStart(e)
                }
            })?;

        // Drain the pipes on their own threads so a chatty solver can never
        // dead-lock against the deadline poll below.
        let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
            SolverError::OutputParse("solver stdout was not captured".to_string())
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            SolverError::OutputParse("solver stderr was not captured".to_string())
        })?;
        let stdout_reader = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout_pipe.read_to_string(&mut buf);
            buf
        });
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + Duration::from_secs(self.tmlim_secs) + KILL_GRACE;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SolverError::Timeout {
                        seconds: self.tmlim_secs,
                    });
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        match solution::classify_stdout(&stdout) {
            StdoutStatus::Infeasible => return Ok(SolveOutcome::Infeasible),
            StdoutStatus::Unbounded => return Err(SolverError::Unbounded),
            StdoutStatus::Optimal => {}
            StdoutStatus::Unknown => {
                let code = status.code().unwrap_or(-1);
                error!("**** GLPK ERROR (model={}) ****", model_file.display());
                error!("{stderr}{stdout}");
                return Err(SolverError::ProcessFailed {
                    exit_code: code,
                    message: format!("{stderr}{stdout}"),
                });
            }
        }

        let sol_text = fs::read_to_string(sol_file).ok();
        let sol = solution::build_solution(&stdout, sol_text.as_deref())?;
        if dump_stdout {
            info!("{stdout}");
        } else {
            let lines: Vec<&str> = sol.decision_lines().collect();
            info!("solution\n{}", lines.join("\n"));
        }
        Ok(SolveOutcome::Optimal(sol))
    }
}
