//! CLI surface: a `clap` derive `Config` with flag parsing colocated
//! alongside its documentation.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::partition::MergeHeuristic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Unweighted/weighted-uniform core-guided search.
    Msu3,
    /// Weighted OLL with core-weight splitting.
    Oll,
    /// Accepted as an alias of `oll` for flag-vocabulary compatibility;
    /// not the default.
    Wbo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergeHeuristicArg {
    Size,
    Cores,
    SaturationOnly,
}

impl From<MergeHeuristicArg> for MergeHeuristic {
    fn from(v: MergeHeuristicArg) -> Self {
        match v {
            MergeHeuristicArg::Size => MergeHeuristic::Size,
            MergeHeuristicArg::Cores => MergeHeuristic::Cores,
            MergeHeuristicArg::SaturationOnly => MergeHeuristic::SaturationOnly,
        }
    }
}

/// A (Partial, Weighted, Partitioned) MaxSAT solver driven by unsat-core
/// guided search.
#[derive(Debug, Parser)]
#[command(name = "pwmaxsat", version)]
pub struct Config {
    /// WCNF/PWCNF/OPB input file; reads stdin if omitted.
    pub input: Option<PathBuf>,

    /// Core-guided search algorithm.
    #[arg(long, value_enum, default_value_t = Algorithm::Msu3)]
    pub algo: Algorithm,

    /// Disable BMO lexicographic driving even when the weight structure
    /// qualifies (applied by default otherwise).
    #[arg(long)]
    pub no_bmo: bool,

    /// Drive the partition controller instead of a single flat search.
    #[arg(long)]
    pub partition: bool,

    /// Partition merge heuristic.
    #[arg(long, value_enum, default_value_t = MergeHeuristicArg::Size)]
    pub merge_heuristic: MergeHeuristicArg,

    /// Conflict budget per oracle query during partition saturation
    /// (phase 1 only); unset means unbounded.
    #[arg(long)]
    pub partition_conflict_limit: Option<u64>,

    /// CPU time limit in seconds (SIGXCPU at expiry via `rlimit`).
    #[arg(long)]
    pub cpu_limit: Option<u64>,

    /// Address space limit in bytes (via `rlimit`).
    #[arg(long)]
    pub mem_limit: Option<u64>,

    /// Emit the loaded formula back out as PWCNF before solving.
    #[arg(long)]
    pub emit_pwcnf: Option<PathBuf>,

    /// Dump final statistics as JSON.
    #[arg(long)]
    pub stats_json: Option<PathBuf>,

    /// After the optimum is found, enumerate every optimal model.
    #[arg(long)]
    pub all_opt_sols: bool,

    /// Suppress ANSI coloring of status lines.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (`-v`, `-vv`, ...).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn effective_bmo(&self) -> bool {
        !self.no_bmo
    }
}
