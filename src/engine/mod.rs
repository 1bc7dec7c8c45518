//! The shared core-guided outer loop. `MSU3` (`msu3.rs`) and weighted `OLL`
//! (`oll.rs`) each implement [`CoreGuidedStrategy`]; this module drives both
//! through the same SAT-call / core-extraction / re-solve cycle.
pub mod enumerate;
pub mod msu3;
pub mod oll;

use crate::error::{MaxSatError, Result};
use crate::formula::Formula;
use crate::oracle::{SatOracle, SolveResult};
use crate::types::*;

/// Allocates (if missing) a relaxation variable for each soft clause in
/// `indices` and asserts the augmented clause in the oracle: each clause
/// gets a fresh relaxation variable appended to its literals in the oracle.
pub fn ensure_relaxation_vars(formula: &mut Formula, oracle: &mut dyn SatOracle, indices: &[usize]) {
    for &i in indices {
        if formula.soft[i].relaxation_var.is_none() {
            let v = oracle.new_variable();
            formula.soft[i].relaxation_var = Some(v);
            let mut augmented = formula.soft[i].lits.clone();
            augmented.push(v.pos_lit());
            oracle.add_clause(&augmented);
        }
    }
}

/// The per-algorithm hook: `current_assumptions` builds the next query's
/// assumption set from whatever internal state the strategy carries
/// (activated soft clauses, totalizer bound literals); `activate_core`
/// reacts to a returned unsat core by updating that state.
pub trait CoreGuidedStrategy {
    /// Soft-clause indices this strategy instance is responsible for. Grows
    /// as OLL splits clauses; fixed for MSU3.
    fn universe(&self) -> &[usize];
    fn current_assumptions(&self, formula: &Formula) -> Vec<Lit>;
    fn activate_core(&mut self, core: &[Lit], formula: &mut Formula, oracle: &mut dyn SatOracle) -> Result<()>;
    fn lb(&self) -> Weight;
}

#[derive(Debug, Clone)]
pub enum EngineOutcome {
    Optimum { cost: Weight, model: Vec<bool> },
    Unsat,
    /// Conflict budget exhausted before a verdict; treated as successful
    /// partition saturation, not failure.
    Unknown,
}

/// Sums the weight of every soft clause in `universe` whose relaxation
/// variable the model sets true.
fn compute_cost(universe: &[usize], formula: &Formula, oracle: &dyn SatOracle) -> Weight {
    universe
        .iter()
        .filter_map(|&i| formula.soft[i].relaxation_var.map(|v| (i, v)))
        .filter(|&(_, v)| oracle.model_value(v))
        .map(|(i, _)| formula.soft[i].weight)
        .sum()
}

fn extract_model(formula: &Formula, oracle: &dyn SatOracle) -> Vec<bool> {
    (1..=formula.num_vars).map(|v| oracle.model_value(v)).collect()
}

/// The shared search loop. The very first call is unassumed (tests whether
/// the hard clauses plus every soft clause holding as written is already
/// satisfiable); once that resolves, every later call runs under
/// `strategy.current_assumptions`.
pub fn run_core_guided(
    formula: &mut Formula,
    oracle: &mut dyn SatOracle,
    strategy: &mut dyn CoreGuidedStrategy,
    conflict_budget: Option<u64>,
) -> Result<EngineOutcome> {
    let mut ub: Option<Weight> = None;
    let mut best_model: Option<Vec<bool>> = None;
    let mut first_call = true;

    loop {
        match conflict_budget {
            Some(b) => oracle.set_conflict_budget(b),
            None => oracle.clear_conflict_budget(),
        }
        let assumptions = if first_call {
            Vec::new()
        } else {
            strategy.current_assumptions(formula)
        };
        match oracle.solve(&assumptions) {
            SolveResult::Unknown => return Ok(EngineOutcome::Unknown),
            SolveResult::Sat => {
                let universe = strategy.universe().to_vec();
                let cost = compute_cost(&universe, formula, oracle);
                if ub.map_or(true, |u| cost < u) {
                    log::debug!("new incumbent: cost {cost} (lb {})", strategy.lb());
                    ub = Some(cost);
                    best_model = Some(extract_model(formula, oracle));
                }
                if first_call {
                    first_call = false;
                    if cost == 0 {
                        return Ok(EngineOutcome::Optimum {
                            cost: 0,
                            model: best_model.unwrap(),
                        });
                    }
                    continue;
                }
                return Ok(EngineOutcome::Optimum {
                    cost: ub.unwrap(),
                    model: best_model.unwrap(),
                });
            }
            SolveResult::Unsat(core) => {
                if first_call || core.is_empty() {
                    return Ok(EngineOutcome::Unsat);
                }
                log::trace!("unsat core of size {}, raising lb past {}", core.len(), strategy.lb());
                strategy.activate_core(&core, formula, oracle)?;
            }
        }
    }
}

pub(crate) fn contract_violation(reason: impl Into<String>) -> MaxSatError {
    MaxSatError::Internal(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::msu3::Msu3Strategy;
    use crate::oracle::CdclOracle;

    fn unit_soft(x: i32, w: Weight) -> crate::formula::SoftClause {
        crate::formula::SoftClause::new(vec![int2lit(x)], w, None)
    }

    #[test]
    fn trivially_satisfiable_formula_is_optimum_zero() {
        let mut f = Formula::new(1, 1000);
        f.soft.push(unit_soft(1, 5));
        let mut o = CdclOracle::new();
        o.new_variable();
        let indices: Vec<usize> = (0..f.soft.len()).collect();
        let mut strat = Msu3Strategy::new(&mut f, &mut o, &indices);
        let outcome = run_core_guided(&mut f, &mut o, &mut strat, None).unwrap();
        match outcome {
            EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 0),
            other => panic!("expected Optimum, got {:?}", other),
        }
    }
}
