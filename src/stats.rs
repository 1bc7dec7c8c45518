//! JSON statistics and the `s`/`o`/`v`/`c` protocol output: a status
//! vocabulary colored only in non-quiet mode, extended with
//! `s OPTIMUM FOUND`/`s UNKNOWN` and the `o <cost>`/`v <model>` lines a
//! MaxSAT solver needs beyond a plain SAT solver's SATISFIABLE/UNSATISFIABLE.
use std::io::Write;

use serde::Serialize;

use crate::error::StatusCode;
use crate::types::Weight;

const RED: &str = "\x1B[001m\x1B[031m";
const GREEN: &str = "\x1B[001m\x1B[032m";
const BLUE: &str = "\x1B[001m\x1B[034m";
const YELLOW: &str = "\x1B[001m\x1B[033m";
const RESET: &str = "\x1B[000m";

#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub num_vars: usize,
    pub num_hard_clauses: usize,
    pub num_soft_clauses: usize,
    pub num_partitions: usize,
    pub num_oracle_conflicts: u64,
    pub num_cores_extracted: u64,
    pub num_totalizer_clauses: u64,
    pub lb_cost: Weight,
    pub ub_cost: Weight,
    pub elapsed_secs: f64,
}

pub fn colored(status: StatusCode, quiet: bool) -> String {
    let text = status.to_string();
    if quiet {
        return text;
    }
    let color = match status {
        StatusCode::Sat => BLUE,
        StatusCode::Unsat => GREEN,
        StatusCode::Optimum => GREEN,
        StatusCode::Unknown => YELLOW,
        StatusCode::Error => RED,
    };
    format!("{color}{text}{RESET}")
}

pub fn report_status(mut w: impl Write, status: StatusCode, quiet: bool) -> std::io::Result<()> {
    writeln!(w, "{}", colored(status, quiet))
}

/// An `o <cost>` incumbent-improvement line.
pub fn report_incumbent(mut w: impl Write, cost: Weight) -> std::io::Result<()> {
    writeln!(w, "o {cost}")
}

/// A single `v` line listing each variable's DIMACS-style signed literal.
pub fn report_model(mut w: impl Write, model: &[bool]) -> std::io::Result<()> {
    write!(w, "v")?;
    for (i, &b) in model.iter().enumerate() {
        let v = i + 1;
        write!(w, " {}", if b { v as i64 } else { -(v as i64) })?;
    }
    writeln!(w)
}

pub fn report_comment(mut w: impl Write, msg: &str) -> std::io::Result<()> {
    writeln!(w, "c {msg}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_mode_strips_color_codes() {
        let s = colored(StatusCode::Sat, true);
        assert_eq!(s, "s SATISFIABLE");
        let colored_s = colored(StatusCode::Sat, false);
        assert!(colored_s.contains("s SATISFIABLE"));
        assert_ne!(colored_s, s);
    }

    #[test]
    fn model_line_uses_signed_dimacs_literals() {
        let mut buf = Vec::new();
        report_model(&mut buf, &[true, false, true]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "v 1 -2 3\n");
    }
}
