//! End-to-end WCNF/PWCNF scenarios, each built in-process (no fixture
//! files) and driven through the public engine API exactly the way the
//! `pwmaxsat` binary wires formula -> oracle -> strategy.
use std::io::Cursor;

use pwmaxsat::bmo;
use pwmaxsat::engine::msu3::Msu3Strategy;
use pwmaxsat::engine::oll::OllStrategy;
use pwmaxsat::engine::{run_core_guided, EngineOutcome};
use pwmaxsat::formula::io::read;
use pwmaxsat::formula::Formula;
use pwmaxsat::oracle::{AddClauseResult, CdclOracle, SatOracle};
use pwmaxsat::partition::{self, MergeHeuristic};
use pwmaxsat::types::*;

fn fresh_oracle(formula: &Formula) -> (CdclOracle, bool) {
    let mut oracle = CdclOracle::new();
    for _ in 0..formula.num_vars {
        oracle.new_variable();
    }
    let mut ok = true;
    for c in &formula.hard {
        if oracle.add_clause(&c.lits) == AddClauseResult::Contradiction {
            ok = false;
        }
    }
    (oracle, ok)
}

#[test]
fn scenario_1_single_hard_contradiction_is_unsat() {
    let data = "p wcnf 1 2 10\n10 1 0\n10 -1 0\n";
    let (formula, _) = read(Cursor::new(data)).unwrap();
    let (_oracle, hard_ok) = fresh_oracle(&formula);
    assert!(!hard_ok, "hard clauses on a single var forcing both signs must contradict");
}

#[test]
fn scenario_2_two_conflicting_unit_softs_cost_one() {
    let data = "p wcnf 1 2 10\n1 1 0\n1 -1 0\n";
    let (mut formula, _) = read(Cursor::new(data)).unwrap();
    let (mut oracle, hard_ok) = fresh_oracle(&formula);
    assert!(hard_ok);
    let indices: Vec<usize> = (0..formula.soft.len()).collect();
    let mut strat = Msu3Strategy::new(&mut formula, &mut oracle, &indices);
    match run_core_guided(&mut formula, &mut oracle, &mut strat, None).unwrap() {
        EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 1),
        other => panic!("expected Optimum(1), got {other:?}"),
    }
}

#[test]
fn scenario_3_three_unequal_weight_softs_cost_two() {
    // Two softs on `1` (weights 1 and 3), one on `-1` (weight 2): the
    // minimum violated weight is min(1+3, 2) = 2.
    let data = "p wcnf 1 3 100\n1 1 0\n2 -1 0\n3 1 0\n";
    let (mut formula, _) = read(Cursor::new(data)).unwrap();
    let (mut oracle, hard_ok) = fresh_oracle(&formula);
    assert!(hard_ok);
    let indices: Vec<usize> = (0..formula.soft.len()).collect();
    let mut strat = OllStrategy::new(&mut formula, &mut oracle, &indices);
    match run_core_guided(&mut formula, &mut oracle, &mut strat, None).unwrap() {
        EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 2),
        other => panic!("expected Optimum(2), got {other:?}"),
    }
}

#[test]
fn scenario_4_bmo_instance_solves_level_by_level() {
    // Weights {100, 10, 1}; with one clause per level, 100 > 10 + 1 = 11 and
    // 10 > 1, so the BMO structural condition holds.
    let data = "p wcnf 3 3 1000\n100 1 0\n10 2 0\n1 3 0\n";
    let (mut formula, _) = read(Cursor::new(data)).unwrap();
    assert!(bmo::is_applicable(&formula));
    let (mut oracle, hard_ok) = fresh_oracle(&formula);
    assert!(hard_ok);
    match bmo::run(&mut formula, &mut oracle).unwrap() {
        EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 0),
        other => panic!("expected Optimum(0), got {other:?}"),
    }
}

#[test]
fn scenario_5_partitioned_msu3_independent_partitions_sum_to_two() {
    // Two partitions, each with a pair of unit softs conflicting only with
    // each other; independent variables across partitions, so merging must
    // not raise the combined cost past 2.
    let data = "p pwcnf 2 4 10 2\n1 1 1 0\n1 1 -1 0\n2 1 2 0\n2 1 -2 0\n";
    let (mut formula, _) = read(Cursor::new(data)).unwrap();
    let (mut oracle, hard_ok) = fresh_oracle(&formula);
    assert!(hard_ok);
    let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
    for (i, s) in formula.soft.iter().enumerate() {
        groups.entry(formula.effective_partition(s.partition_id)).or_default().push(i);
    }
    let outcome = partition::run(&mut formula, &mut oracle, groups.into_iter().collect(), MergeHeuristic::Size, None).unwrap();
    match outcome {
        EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 2),
        other => panic!("expected Optimum(2), got {other:?}"),
    }
}

#[test]
fn scenario_6_oll_core_duplication_splits_and_progresses() {
    // A shared variable pinned two different ways by two weighted groups:
    // the first core assigns weight min(3,5)=3 to the shared cardinality
    // group; a later, differently-weighted core over the same output must
    // duplicate rather than silently reuse the bound. Exact cost isn't
    // asserted on — only that OLL terminates and reports a sound, positive
    // cost.
    let mut formula = Formula::new(2, 1000);
    formula.soft.push(pwmaxsat::formula::SoftClause::new(vec![int2lit(1)], 5, None));
    formula.soft.push(pwmaxsat::formula::SoftClause::new(vec![int2lit(-1)], 3, None));
    formula.soft.push(pwmaxsat::formula::SoftClause::new(vec![int2lit(1), int2lit(2)], 3, None));
    formula.soft.push(pwmaxsat::formula::SoftClause::new(vec![int2lit(1), int2lit(-2)], 3, None));
    let (mut oracle, hard_ok) = fresh_oracle(&formula);
    assert!(hard_ok);
    let indices: Vec<usize> = (0..formula.soft.len()).collect();
    let mut strat = OllStrategy::new(&mut formula, &mut oracle, &indices);
    match run_core_guided(&mut formula, &mut oracle, &mut strat, None).unwrap() {
        EngineOutcome::Optimum { cost, model } => {
            assert!(cost > 0);
            assert!(formula.hard_clauses_satisfied(&model));
            assert_eq!(formula.cost_of(&model), cost);
        }
        other => panic!("expected Optimum, got {other:?}"),
    }
}
