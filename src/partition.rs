//! Partition controller: saturate each partition under its own restricted
//! MSU3 search, then repeatedly merge partitions pairwise until one
//! remains, absorbing each merged-away partition's totalizer encoding
//! rather than rebuilding it from scratch.
use crate::engine::msu3::Msu3Strategy;
use crate::engine::{run_core_guided, CoreGuidedStrategy, EngineOutcome};
use crate::error::Result;
use crate::formula::Formula;
use crate::oracle::SatOracle;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeHeuristic {
    Size,
    Cores,
    SaturationOnly,
}

struct PartitionState {
    id: PartitionId,
    strategy: Msu3Strategy,
    merged_from: Vec<PartitionId>,
}

/// Runs the full saturate-then-merge schedule over `groups` (an initial
/// partitioning of soft-clause indices by id) and returns the same outcome
/// shape the unpartitioned engine does.
pub fn run(
    formula: &mut Formula,
    oracle: &mut dyn SatOracle,
    groups: Vec<(PartitionId, Vec<usize>)>,
    heuristic: MergeHeuristic,
    per_partition_conflict_budget: Option<u64>,
) -> Result<EngineOutcome> {
    let mut states: Vec<PartitionState> = groups
        .into_iter()
        .map(|(id, idx)| PartitionState {
            id,
            strategy: Msu3Strategy::new(formula, oracle, &idx),
            merged_from: Vec::new(),
        })
        .collect();
    // Ascending by size is the default saturation order.
    states.sort_by_key(|s| s.strategy.universe().len());

    for s in states.iter_mut() {
        let outcome = run_core_guided(formula, oracle, &mut s.strategy, per_partition_conflict_budget)?;
        log::debug!("partition {} saturated at lb={} ({:?})", s.id, s.strategy.lb(), outcome);
        if let EngineOutcome::Unsat = outcome {
            return Ok(EngineOutcome::Unsat);
        }
        // Optimum or Unknown (budget-saturated) both just keep this
        // partition's accumulated local lb and move on to the next.
    }

    if states.is_empty() {
        return Ok(EngineOutcome::Optimum {
            cost: 0,
            model: (1..=formula.num_vars).map(|_| false).collect(),
        });
    }

    loop {
        if states.len() <= 1 {
            break;
        }
        if heuristic == MergeHeuristic::SaturationOnly {
            return Ok(EngineOutcome::Unknown);
        }
        let (i, j) = pick_merge_pair(&states, heuristic);
        let (absorb_idx, absorbed_idx) = if states[i].strategy.universe().len() >= states[j].strategy.universe().len() {
            (i, j)
        } else {
            (j, i)
        };
        let absorbed = states.remove(absorbed_idx);
        let absorb_idx = if absorbed_idx < absorb_idx { absorb_idx - 1 } else { absorb_idx };

        states[absorb_idx].strategy.absorb(&absorbed.strategy, formula, oracle);
        states[absorb_idx].merged_from.push(absorbed.id);
        states[absorb_idx].merged_from.extend(absorbed.merged_from);

        match run_core_guided(formula, oracle, &mut states[absorb_idx].strategy, None)? {
            EngineOutcome::Unsat => return Ok(EngineOutcome::Unsat),
            EngineOutcome::Optimum { .. } | EngineOutcome::Unknown => {}
        }
    }

    // One partition remains: no more conflict budget, drive to optimality.
    run_core_guided(formula, oracle, &mut states[0].strategy, None)
}

fn pick_merge_pair(states: &[PartitionState], heuristic: MergeHeuristic) -> (usize, usize) {
    let metric = |s: &PartitionState| -> u64 {
        match heuristic {
            MergeHeuristic::Size => s.strategy.universe().len() as u64,
            MergeHeuristic::Cores => s.strategy.lb(),
            MergeHeuristic::SaturationOnly => unreachable!("caller handles SaturationOnly before ranking"),
        }
    };
    let mut order: Vec<usize> = (0..states.len()).collect();
    order.sort_by_key(|&i| metric(&states[i]));
    (order[0], order[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::SoftClause;
    use crate::oracle::CdclOracle;

    fn unit_soft(x: i32) -> SoftClause {
        SoftClause::new(vec![int2lit(x)], 1, None)
    }

    #[test]
    fn two_independent_partitions_do_not_raise_each_others_cost() {
        // Partition 0: x1 and not-x1, both weight 1 (local optimum cost 1).
        // Partition 1: x2 and not-x2, both weight 1 (local optimum cost 1).
        // Independent variables: merging must not raise the combined cost
        // beyond 2.
        let mut f = Formula::new(2, 10);
        f.soft.push(unit_soft(1)); // idx 0, partition 0
        f.soft.push(unit_soft(-1)); // idx 1, partition 0
        f.soft.push(unit_soft(2)); // idx 2, partition 1
        f.soft.push(unit_soft(-2)); // idx 3, partition 1
        let mut o = CdclOracle::new();
        o.new_variable();
        o.new_variable();
        let groups = vec![(0usize, vec![0usize, 1]), (1usize, vec![2usize, 3])];
        let outcome = run(&mut f, &mut o, groups, MergeHeuristic::Size, None).unwrap();
        match outcome {
            EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 2),
            other => panic!("expected Optimum(2), got {:?}", other),
        }
    }

    #[test]
    fn saturation_only_heuristic_returns_unknown_with_multiple_partitions() {
        let mut f = Formula::new(2, 10);
        f.soft.push(unit_soft(1));
        f.soft.push(unit_soft(-1));
        f.soft.push(unit_soft(2));
        f.soft.push(unit_soft(-2));
        let mut o = CdclOracle::new();
        o.new_variable();
        o.new_variable();
        let groups = vec![(0usize, vec![0usize, 1]), (1usize, vec![2usize, 3])];
        let outcome = run(&mut f, &mut o, groups, MergeHeuristic::SaturationOnly, None).unwrap();
        assert!(matches!(outcome, EngineOutcome::Unknown));
    }
}
