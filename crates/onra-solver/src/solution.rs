//! Parsing of glpsol output.
//!
//! The generated models print one `#`-prefixed line per selected variable:
//!
//! ```text
//! # N1_1  WDM32_1  N1_2  WDM32_1  1  1  0.2  432  701  0
//! ```
//!
//! Pathfinding lines carry 10 columns (`x` at column 5, `c` at column 6);
//! device sub-solve lines carry 7 columns (`c` at column 5). The objective
//! value is read from the `.sol` file's `PATH_COST = <v>` display.

use crate::error::{SolverError, SolverResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// One decision line from the solver output.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    pub src_port: String,
    pub src_ch: String,
    pub dst_port: String,
    pub dst_ch: String,
    /// Pathfinding `x` flag; `None` on device sub-solve lines.
    pub x: Option<bool>,
    /// Activation `c` flag.
    pub c: bool,
}

/// A parsed optimal solution.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    /// Objective value (`PATH_COST`), when the model reports one.
    pub cost: Option<f64>,
    pub rows: Vec<SolutionRow>,
    /// Raw solver stdout, kept for `dumpglpsol` logging and diagnostics.
    pub stdout: String,
}

impl Solution {
    /// Decision lines the model printed, for quiet logging.
    pub fn decision_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().filter(|l| l.starts_with('#'))
    }
}

/// Classification of the status glpsol printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Unknown,
}

/// Classify the solver's stdout.
pub fn classify_stdout(stdout: &str) -> StdoutStatus {
    if stdout.contains("HAS NO PRIMAL FEASIBLE SOLUTION")
        || stdout.contains("HAS NO FEASIBLE SOLUTION")
        || stdout.contains("PROBLEM HAS NO INTEGER FEASIBLE SOLUTION")
    {
        StdoutStatus::Infeasible
    } else if stdout.contains("HAS UNBOUNDED SOLUTION") {
        StdoutStatus::Unbounded
    } else if stdout.contains("OPTIMAL LP SOLUTION FOUND")
        || stdout.contains("INTEGER OPTIMAL SOLUTION FOUND")
        || stdout.contains("SOLUTION FOUND")
    {
        StdoutStatus::Optimal
    } else {
        StdoutStatus::Unknown
    }
}

fn parse_flag(txt: &str) -> bool {
    txt == "1"
}

/// Parse the `#` decision lines out of solver stdout.
pub fn parse_rows(stdout: &str) -> Vec<SolutionRow> {
    let mut rows = Vec::new();
    for line in stdout.lines() {
        if !line.starts_with('#') {
            continue;
        }
        let v: Vec<&str> = line.split_whitespace().collect();
        match v.len() {
            10 => rows.push(SolutionRow {
                src_port: v[1].to_string(),
                src_ch: v[2].to_string(),
                dst_port: v[3].to_string(),
                dst_ch: v[4].to_string(),
                x: Some(parse_flag(v[5])),
                c: parse_flag(v[6]),
            }),
            7 => rows.push(SolutionRow {
                src_port: v[1].to_string(),
                src_ch: v[2].to_string(),
                dst_port: v[3].to_string(),
                dst_ch: v[4].to_string(),
                x: None,
                c: parse_flag(v[5]),
            }),
            _ => {}
        }
    }
    rows
}

static PATH_COST: Lazy<Regex> = Lazy::new(|| Regex::new(r"PATH_COST = ([0-9.]+)").unwrap());

/// Read the `PATH_COST` objective from the head of a `.sol` file. Only the
/// first lines are inspected; a missing display yields `None`.
pub fn parse_cost(sol_text: &str) -> Option<f64> {
    for line in sol_text.lines().take(10) {
        if let Some(caps) = PATH_COST.captures(line) {
            let c: f64 = caps[1].parse().ok()?;
            if c > 0.0 {
                return Some(c);
            }
            return None;
        }
    }
    None
}

/// Assemble a [`Solution`] from captured stdout and the `.sol` text.
pub fn build_solution(stdout: &str, sol_text: Option<&str>) -> SolverResult<Solution> {
    let rows = parse_rows(stdout);
    let cost = sol_text.and_then(parse_cost);
    if rows.is_empty() && cost.is_none() && !stdout.contains("SOLUTION FOUND") {
        return Err(SolverError::OutputParse(
            "no decision lines and no objective in solver output".to_string(),
        ));
    }
    Ok(Solution {
        cost,
        rows,
        stdout: stdout.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PF_STDOUT: &str = "\
GLPSOL--GLPK LP/MIP Solver\n\
INTEGER OPTIMAL SOLUTION FOUND\n\
# A_2 WDM32_1 B_1 WDM32_1 1 1 0.1 12 0 0\n\
# B_4 WDM32_1 C_1 WDM32_1 1 1 0.1 15 0 0\n\
# B_1 WDM32_1 B_4 WDM32_1 0 1 0.0 13 0 0\n";

    const SOLVEC_STDOUT: &str = "\
INTEGER OPTIMAL SOLUTION FOUND\n\
# N1_1 WDM32_1 N1_2 WDM32_1 1 0.0\n\
# N1_3 WDM32_1 N1_4 WDM32_1 0 0.0\n";

    #[test]
    fn classifies_statuses() {
        assert_eq!(classify_stdout(PF_STDOUT), StdoutStatus::Optimal);
        assert_eq!(
            classify_stdout("PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION"),
            StdoutStatus::Infeasible
        );
        assert_eq!(
            classify_stdout("PROBLEM HAS UNBOUNDED SOLUTION"),
            StdoutStatus::Unbounded
        );
        assert_eq!(classify_stdout("noise"), StdoutStatus::Unknown);
    }

    #[test]
    fn parses_pf_rows_with_x_and_c() {
        let rows = parse_rows(PF_STDOUT);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].src_port, "A_2");
        assert_eq!(rows[0].x, Some(true));
        assert!(rows[0].c);
        assert_eq!(rows[2].x, Some(false));
    }

    #[test]
    fn parses_solvec_rows_without_x() {
        let rows = parse_rows(SOLVEC_STDOUT);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].x, None);
        assert!(rows[0].c);
        assert!(!rows[1].c);
    }

    #[test]
    fn cost_comes_from_sol_head() {
        assert_eq!(parse_cost("Objective:  PATH_COST = 1.4003 (MINimum)\n"), Some(1.4003));
        assert_eq!(parse_cost("PATH_COST = 0 (MINimum)\n"), None);
        assert_eq!(parse_cost("nothing here\n"), None);
        // Only the head is inspected.
        let deep = format!("{}PATH_COST = 2.0\n", "line\n".repeat(20));
        assert_eq!(parse_cost(&deep), None);
    }

    #[test]
    fn build_solution_requires_some_signal() {
        assert!(build_solution("garbage", None).is_err());
        let sol = build_solution(PF_STDOUT, Some("PATH_COST = 1.5 (MINimum)")).unwrap();
        assert_eq!(sol.cost, Some(1.5));
        assert_eq!(sol.rows.len(), 3);
        assert_eq!(sol.decision_lines().count(), 3);
    }
}
