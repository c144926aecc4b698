//! Driver integration tests against a scripted stand-in for glpsol.

use onra_solver::{GlpsolDriver, SolveOutcome, SolverError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Install a shell script that plays the solver role.
fn fake_solver(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("glpsol");
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "end;\n").unwrap();
    path
}

#[test]
fn optimal_run_parses_rows_and_cost() {
    let dir = TempDir::new().unwrap();
    let body = r##"
OUT=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) OUT="$2"; shift 2;;
    *) shift;;
  esac
done
echo "GLPSOL--GLPK LP/MIP Solver"
echo "INTEGER OPTIMAL SOLUTION FOUND"
echo "# A_2 WDM32_1 B_1 WDM32_1 1 1 0.1 1 0 0"
echo "PATH_COST = 1.25 (MINimum)" > "$OUT"
exit 0
"##;
    let binary = fake_solver(dir.path(), body);
    let driver = GlpsolDriver::with_binary(&binary, 5);
    let model = touch(dir.path(), "a.model");
    let data = touch(dir.path(), "a.data");
    let outcome = driver
        .solve(&model, &data, &dir.path().join("a.sol"), false)
        .unwrap();
    let SolveOutcome::Optimal(sol) = outcome else {
        panic!("expected an optimal outcome");
    };
    assert_eq!(sol.cost, Some(1.25));
    assert_eq!(sol.rows.len(), 1);
    assert_eq!(sol.rows[0].src_port, "A_2");
    assert_eq!(sol.rows[0].x, Some(true));
}

#[test]
fn infeasible_run_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let binary = fake_solver(
        dir.path(),
        "echo 'PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION'\nexit 0\n",
    );
    let driver = GlpsolDriver::with_binary(&binary, 5);
    let model = touch(dir.path(), "a.model");
    let data = touch(dir.path(), "a.data");
    let outcome = driver
        .solve(&model, &data, &dir.path().join("a.sol"), false)
        .unwrap();
    assert!(matches!(outcome, SolveOutcome::Infeasible));
}

#[test]
fn unbounded_and_garbage_are_errors() {
    let dir = TempDir::new().unwrap();
    let binary = fake_solver(
        dir.path(),
        "echo 'PROBLEM HAS UNBOUNDED SOLUTION'\nexit 0\n",
    );
    let driver = GlpsolDriver::with_binary(&binary, 5);
    let model = touch(dir.path(), "a.model");
    let data = touch(dir.path(), "a.data");
    let err = driver
        .solve(&model, &data, &dir.path().join("a.sol"), false)
        .unwrap_err();
    assert!(matches!(err, SolverError::Unbounded));

    let binary = fake_solver(dir.path(), "echo 'model parse error' >&2\nexit 1\n");
    let driver = GlpsolDriver::with_binary(&binary, 5);
    let err = driver
        .solve(&model, &data, &dir.path().join("a.sol"), false)
        .unwrap_err();
    match err {
        SolverError::ProcessFailed { exit_code, message } => {
            assert_eq!(exit_code, 1);
            assert!(message.contains("model parse error"));
        }
        other => panic!("expected ProcessFailed, got {other:?}"),
    }
}
