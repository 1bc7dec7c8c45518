//! Solution enumeration via blocking clauses, used once the optimum is
//! known and `--all-opt-sols` is requested. Assumptions already pin
//! `lb = ub`, so every enumerated model is optimal by construction.
use crate::formula::Formula;
use crate::oracle::{SatOracle, SolveResult};
use crate::types::*;

/// Re-solves under `assumptions` after adding, before each attempt, a clause
/// forbidding the relaxation-variable assignment of the previous model.
/// Returns every optimal model found, in discovery order, halting on the
/// first UNSAT.
pub fn enumerate_optima(
    universe: &[usize],
    formula: &Formula,
    oracle: &mut dyn SatOracle,
    assumptions: &[Lit],
    first_model: Vec<bool>,
) -> Vec<Vec<bool>> {
    let mut models = vec![first_model];
    loop {
        let blocking: Vec<Lit> = universe
            .iter()
            .filter_map(|&i| formula.soft[i].relaxation_var)
            .map(|v| {
                if oracle.model_value(v) {
                    v.neg_lit()
                } else {
                    v.pos_lit()
                }
            })
            .collect();
        if blocking.is_empty() {
            // no relaxation variables to vary over: only one model exists.
            return models;
        }
        oracle.add_clause(&blocking);
        match oracle.solve(assumptions) {
            SolveResult::Sat => {
                let model = (1..=formula.num_vars).map(|v| oracle.model_value(v)).collect();
                models.push(model);
            }
            SolveResult::Unsat(_) | SolveResult::Unknown => return models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ensure_relaxation_vars, run_core_guided, msu3::Msu3Strategy, EngineOutcome};
    use crate::oracle::CdclOracle;

    #[test]
    fn enumerates_all_optima_for_a_free_variable() {
        // A single unconstrained variable with no clauses at all: both
        // truth values are optimal (cost 0), so enumeration should find
        // exactly one model before the blocking clauses run out of slack
        // (there are no soft clauses at all here, so blocking is empty and
        // enumeration halts immediately after the first model).
        let mut f = Formula::new(1, 10);
        let mut o = CdclOracle::new();
        o.new_variable();
        let indices: Vec<usize> = Vec::new();
        ensure_relaxation_vars(&mut f, &mut o, &indices);
        let mut strat = Msu3Strategy::new(&mut f, &mut o, &indices);
        let outcome = run_core_guided(&mut f, &mut o, &mut strat, None).unwrap();
        let model = match outcome {
            EngineOutcome::Optimum { model, .. } => model,
            other => panic!("expected Optimum, got {:?}", other),
        };
        let models = enumerate_optima(&indices, &f, &mut o, &[], model);
        assert_eq!(models.len(), 1);
    }
}
