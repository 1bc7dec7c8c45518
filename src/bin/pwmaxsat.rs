//! The `pwmaxsat` binary: reads an input formula, wires it into a fresh
//! oracle, dispatches to the configured search strategy, and reports the
//! outcome in the `s`/`o`/`v`/`c` protocol with the matching exit code. A
//! watcher thread polls `signal-hook` flags for `SIGTERM`/`SIGXCPU` and
//! cancels the run cooperatively.
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use pwmaxsat::bmo;
use pwmaxsat::cancel::CancellationToken;
use pwmaxsat::cli::{Algorithm, Config};
use pwmaxsat::engine::enumerate::enumerate_optima;
use pwmaxsat::engine::msu3::Msu3Strategy;
use pwmaxsat::engine::oll::OllStrategy;
use pwmaxsat::engine::{run_core_guided, CoreGuidedStrategy, EngineOutcome};
use pwmaxsat::error::{MaxSatError, Result, Signal, StatusCode};
use pwmaxsat::formula::io::{read, write_pwcnf};
use pwmaxsat::formula::Formula;
use pwmaxsat::oracle::{AddClauseResult, CdclOracle, SatOracle};
use pwmaxsat::partition;
use pwmaxsat::stats::{self, Stats};
use pwmaxsat::types::ProblemType;

fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config);

    match run(&config) {
        Ok(status) => ExitCode::from(status as u8),
        Err(e) => {
            eprintln!("c error: {e}");
            let status = e.status();
            let _ = stats::report_status(io::stdout().lock(), status, config.quiet);
            ExitCode::from(status as u8)
        }
    }
}

fn init_logging(config: &Config) {
    let level = match config.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(config: &Config) -> Result<StatusCode> {
    let start = Instant::now();
    let mut formula = load_formula(config)?;

    if let Some(path) = &config.emit_pwcnf {
        let f = File::create(path).map_err(io_err)?;
        write_pwcnf(&formula, BufWriter::new(f), false).map_err(io_err)?;
    }

    let token = CancellationToken::new();
    install_signal_handlers(config, token.clone())?;

    let mut oracle = CdclOracle::new();
    for _ in 0..formula.num_vars {
        oracle.new_variable();
    }
    oracle.set_cancel_token(token.clone());
    let hard_ok = assert_hard_clauses(&mut oracle, &formula);

    let mut stats = Stats {
        num_vars: formula.num_vars,
        num_hard_clauses: formula.hard.len(),
        num_soft_clauses: formula.soft.len(),
        num_partitions: formula.n_partitions.max(1),
        ..Default::default()
    };

    let (outcome, extra_models) = if !hard_ok {
        (EngineOutcome::Unsat, None)
    } else if config.partition {
        let groups = partition_groups(&formula);
        let outcome = partition::run(
            &mut formula,
            &mut oracle,
            groups,
            config.merge_heuristic.into(),
            config.partition_conflict_limit,
        )?;
        (outcome, None)
    } else if config.effective_bmo() && bmo::is_applicable(&formula) {
        (bmo::run(&mut formula, &mut oracle)?, None)
    } else {
        run_flat(config, &mut formula, &mut oracle)?
    };

    stats.num_oracle_conflicts = oracle.num_conflicts();
    stats.elapsed_secs = start.elapsed().as_secs_f64();
    if let EngineOutcome::Optimum { cost, .. } = &outcome {
        stats.lb_cost = *cost;
        stats.ub_cost = *cost;
    }

    let status = report_outcome(&outcome, extra_models.as_deref(), config, &token);

    if let Some(path) = &config.stats_json {
        let f = File::create(path).map_err(io_err)?;
        serde_json::to_writer_pretty(f, &stats).map_err(|e| MaxSatError::Internal(e.to_string()))?;
    }

    Ok(status)
}

/// Runs the flat (unpartitioned, non-BMO) search under whichever algorithm
/// `--algo` selects, enumerating every optimal model afterward if
/// `--all-opt-sols` was given.
fn run_flat(
    config: &Config,
    formula: &mut Formula,
    oracle: &mut CdclOracle,
) -> Result<(EngineOutcome, Option<Vec<Vec<bool>>>)> {
    let indices: Vec<usize> = (0..formula.soft.len()).collect();
    match config.algo {
        Algorithm::Msu3 => {
            if formula.problem_type() == ProblemType::Weighted {
                // Reaching the flat (non-BMO) path with a weighted formula
                // means BMO was either inapplicable or disabled: MSU3's
                // "one core, lb += 1" rule ignores weight and is unsound
                // here.
                return Err(MaxSatError::Misconfigured(
                    "MSU3 requires an unweighted formula, or a weighted one where BMO applies; \
                     use --algo oll, or drop --no-bmo if the weight structure qualifies"
                        .into(),
                ));
            }
            let mut strat = Msu3Strategy::new(formula, &mut *oracle, &indices);
            let outcome = run_core_guided(formula, &mut *oracle, &mut strat, None)?;
            let extra = all_opt_models(config, &outcome, formula, &mut *oracle, &strat);
            Ok((outcome, extra))
        }
        Algorithm::Oll | Algorithm::Wbo => {
            let mut strat = OllStrategy::new(formula, &mut *oracle, &indices);
            let outcome = run_core_guided(formula, &mut *oracle, &mut strat, None)?;
            let extra = all_opt_models(config, &outcome, formula, &mut *oracle, &strat);
            Ok((outcome, extra))
        }
    }
}

fn all_opt_models(
    config: &Config,
    outcome: &EngineOutcome,
    formula: &Formula,
    oracle: &mut CdclOracle,
    strat: &dyn CoreGuidedStrategy,
) -> Option<Vec<Vec<bool>>> {
    if !config.all_opt_sols {
        return None;
    }
    let EngineOutcome::Optimum { model, .. } = outcome else {
        return None;
    };
    let assumptions = strat.current_assumptions(formula);
    Some(enumerate_optima(strat.universe(), formula, oracle, &assumptions, model.clone()))
}

fn io_err(e: io::Error) -> MaxSatError {
    MaxSatError::Internal(e.to_string())
}

fn load_formula(config: &Config) -> Result<Formula> {
    match &config.input {
        Some(path) => {
            let f = File::open(path).map_err(io_err)?;
            read(BufReader::new(f)).map(|(f, _)| f)
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(io_err)?;
            read(io::Cursor::new(buf)).map(|(f, _)| f)
        }
    }
}

/// Asserts every hard clause in the oracle; returns `false` if the hard part
/// alone is already contradictory (a unit clause conflicting with an
/// already-forced literal), letting the caller short-circuit to `UNSAT`
/// without ever calling `solve`.
fn assert_hard_clauses(oracle: &mut dyn SatOracle, formula: &Formula) -> bool {
    let mut ok = true;
    for c in &formula.hard {
        if oracle.add_clause(&c.lits) == AddClauseResult::Contradiction {
            ok = false;
        }
    }
    ok
}

/// Groups soft-clause indices by their effective partition id (user
/// partition, or the shared overflow bucket) for `--partition` runs.
fn partition_groups(formula: &Formula) -> Vec<(usize, Vec<usize>)> {
    let mut map: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
    for (i, s) in formula.soft.iter().enumerate() {
        map.entry(formula.effective_partition(s.partition_id)).or_default().push(i);
    }
    map.into_iter().collect()
}

fn report_outcome(
    outcome: &EngineOutcome,
    extra_models: Option<&[Vec<bool>]>,
    config: &Config,
    token: &CancellationToken,
) -> StatusCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match outcome {
        EngineOutcome::Optimum { cost, model } => {
            let _ = stats::report_status(&mut out, StatusCode::Optimum, config.quiet);
            let _ = stats::report_incumbent(&mut out, *cost);
            match extra_models {
                Some(models) => {
                    for (i, m) in models.iter().enumerate() {
                        let _ = stats::report_comment(&mut out, &format!("optimal solution {}", i + 1));
                        let _ = stats::report_model(&mut out, m);
                    }
                }
                None => {
                    let _ = stats::report_model(&mut out, model);
                }
            }
            StatusCode::Optimum
        }
        EngineOutcome::Unsat => {
            let _ = stats::report_status(&mut out, StatusCode::Unsat, config.quiet);
            StatusCode::Unsat
        }
        EngineOutcome::Unknown => {
            let _ = stats::report_status(&mut out, StatusCode::Unknown, config.quiet);
            if let Some(sig) = token.signal() {
                let _ = stats::report_comment(&mut out, &format!("terminated by {sig}"));
            }
            StatusCode::Unknown
        }
    }
}

/// Registers `SIGTERM`/`SIGXCPU` flags and spawns a watcher thread that
/// cancels `token` on receipt, and applies `--cpu-limit`/`--mem-limit` as OS
/// resource limits via `rlimit` (a CPU limit is what makes the kernel raise
/// `SIGXCPU` in the first place).
fn install_signal_handlers(config: &Config, token: CancellationToken) -> Result<()> {
    let term_flag = Arc::new(AtomicBool::new(false));
    let xcpu_flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term_flag))
        .map_err(io_err)?;
    signal_hook::flag::register(signal_hook::consts::SIGXCPU, Arc::clone(&xcpu_flag))
        .map_err(io_err)?;

    if let Some(secs) = config.cpu_limit {
        rlimit::setrlimit(rlimit::Resource::CPU, secs, secs).map_err(io_err)?;
    }
    if let Some(bytes) = config.mem_limit {
        rlimit::setrlimit(rlimit::Resource::AS, bytes, bytes).map_err(io_err)?;
    }

    std::thread::spawn(move || loop {
        if term_flag.load(Ordering::Relaxed) {
            token.cancel(Signal::Term);
            return;
        }
        if xcpu_flag.load(Ordering::Relaxed) {
            token.cancel(Signal::Xcpu);
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwmaxsat::formula::SoftClause;
    use pwmaxsat::types::int2lit;

    #[test]
    fn msu3_on_weighted_formula_is_misconfigured() {
        let mut formula = Formula::new(1, 1000);
        formula.soft.push(SoftClause::new(vec![int2lit(1)], 1, None));
        formula.soft.push(SoftClause::new(vec![int2lit(-1)], 2, None));
        let mut oracle = CdclOracle::new();
        oracle.new_variable();
        let config = Config::parse_from(["pwmaxsat", "--algo", "msu3"]);
        match run_flat(&config, &mut formula, &mut oracle) {
            Err(MaxSatError::Misconfigured(_)) => {}
            other => panic!("expected Misconfigured, got {other:?}"),
        }
    }
}
