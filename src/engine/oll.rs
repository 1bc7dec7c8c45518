//! Weighted OLL engine: core-weight splitting plus a per-core size-1 "soft
//! cardinality" totalizer, tracked in `groups`. Growth vs. duplication on
//! repeated cores keeps the assumption set a consistent lower-bound
//! decomposition.
use std::collections::HashSet;

use super::{contract_violation, ensure_relaxation_vars, CoreGuidedStrategy};
use crate::error::Result;
use crate::formula::{Formula, SoftClause};
use crate::oracle::SatOracle;
use crate::totalizer::Totalizer;
use crate::types::*;

struct BoundGroup {
    totalizer: Totalizer,
    bound: usize,
    weight: Weight,
    assumption: Lit,
}

pub struct OllStrategy {
    universe: Vec<usize>,
    active: HashSet<usize>,
    lb: Weight,
    groups: Vec<BoundGroup>,
}

impl OllStrategy {
    pub fn new(formula: &mut Formula, oracle: &mut dyn SatOracle, indices: &[usize]) -> Self {
        ensure_relaxation_vars(formula, oracle, indices);
        OllStrategy {
            universe: indices.to_vec(),
            active: HashSet::new(),
            lb: 0,
            groups: Vec::new(),
        }
    }

    fn group_index_of(&self, lit: Lit) -> Option<usize> {
        self.groups.iter().position(|g| g.assumption == lit)
    }
}

enum Member {
    Fresh(usize),
    Group(usize),
}

impl CoreGuidedStrategy for OllStrategy {
    fn universe(&self) -> &[usize] {
        &self.universe
    }

    fn current_assumptions(&self, formula: &Formula) -> Vec<Lit> {
        let mut out: Vec<Lit> = self
            .universe
            .iter()
            .filter(|i| !self.active.contains(i))
            .map(|&i| formula.soft[i].assumption_lit().expect("relaxation var set by ensure_relaxation_vars").negate())
            .collect();
        out.extend(self.groups.iter().map(|g| g.assumption));
        out
    }

    fn activate_core(&mut self, core: &[Lit], formula: &mut Formula, oracle: &mut dyn SatOracle) -> Result<()> {
        let mut members: Vec<Member> = Vec::new();
        for &lit in core {
            if let Some(gi) = self.group_index_of(lit) {
                members.push(Member::Group(gi));
                continue;
            }
            let fresh = self
                .universe
                .iter()
                .find(|&&i| !self.active.contains(&i) && formula.soft[i].assumption_lit() == Some(lit));
            match fresh {
                Some(&idx) => members.push(Member::Fresh(idx)),
                None => {
                    return Err(contract_violation(
                        "unsat core literal matched neither a soft clause nor a tracked cardinality group",
                    ))
                }
            }
        }
        if members.is_empty() {
            return Err(contract_violation("unsat core carried no recognizable assumption literal"));
        }

        let w_star = members
            .iter()
            .map(|m| match m {
                Member::Fresh(idx) => formula.soft[*idx].weight,
                Member::Group(gi) => self.groups[*gi].weight,
            })
            .min()
            .expect("members is non-empty");
        self.lb += w_star;

        let mut new_group_inputs: Vec<Lit> = Vec::new();
        for m in &members {
            match m {
                Member::Fresh(idx) => {
                    let idx = *idx;
                    let relax_lit = if formula.soft[idx].weight > w_star {
                        let new_idx = formula.soft.len();
                        let v = oracle.new_variable();
                        let mut augmented = formula.soft[idx].lits.clone();
                        augmented.push(v.pos_lit());
                        oracle.add_clause(&augmented);
                        formula.soft[idx].weight -= w_star;
                        formula.soft.push(SoftClause {
                            lits: formula.soft[idx].lits.clone(),
                            weight: w_star,
                            partition_id: formula.soft[idx].partition_id,
                            relaxation_var: Some(v),
                        });
                        self.universe.push(new_idx);
                        self.active.insert(new_idx);
                        v.pos_lit()
                    } else {
                        self.active.insert(idx);
                        formula.soft[idx].relaxation_lit().unwrap()
                    };
                    new_group_inputs.push(relax_lit);
                }
                Member::Group(gi) => {
                    let gi = *gi;
                    if self.groups[gi].weight == w_star {
                        let new_bound = self.groups[gi].bound + 1;
                        if let Some(lit) = self.groups[gi].totalizer.inc_update(new_bound, oracle) {
                            self.groups[gi].bound = new_bound;
                            self.groups[gi].assumption = lit;
                        }
                    } else {
                        self.groups[gi].weight -= w_star;
                        let inputs = self.groups[gi].totalizer.inputs().to_vec();
                        let bound = self.groups[gi].bound;
                        let mut dup = Totalizer::new();
                        dup.build(&inputs, bound, oracle);
                        if let Some(lit) = dup.inc_update(bound, oracle) {
                            self.groups.push(BoundGroup {
                                totalizer: dup,
                                bound,
                                weight: w_star,
                                assumption: lit,
                            });
                        }
                    }
                }
            }
        }
        if !new_group_inputs.is_empty() {
            let mut t = Totalizer::new();
            t.build(&new_group_inputs, 1, oracle);
            if let Some(lit) = t.inc_update(1, oracle) {
                self.groups.push(BoundGroup {
                    totalizer: t,
                    bound: 1,
                    weight: w_star,
                    assumption: lit,
                });
            }
        }
        Ok(())
    }

    fn lb(&self) -> Weight {
        self.lb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{run_core_guided, EngineOutcome};
    use crate::oracle::CdclOracle;

    fn unit_soft(x: i32, w: Weight) -> SoftClause {
        SoftClause::new(vec![int2lit(x)], w, None)
    }

    #[test]
    fn unequal_weight_conflict_takes_minimum() {
        // 1 -1 (weight 1), 2 -1 (weight 2), 3 1 (weight 3): forcing var 1 to a
        // single value always violates at least min(1+3, 2) = 2 of weight.
        let mut f = Formula::new(1, 100);
        f.soft.push(unit_soft(1, 1));
        f.soft.push(unit_soft(-1, 2));
        f.soft.push(unit_soft(1, 3));
        let mut o = CdclOracle::new();
        o.new_variable();
        let indices: Vec<usize> = (0..f.soft.len()).collect();
        let mut strat = OllStrategy::new(&mut f, &mut o, &indices);
        let outcome = run_core_guided(&mut f, &mut o, &mut strat, None).unwrap();
        match outcome {
            EngineOutcome::Optimum { cost, .. } => assert_eq!(cost, 2),
            other => panic!("expected Optimum(2), got {:?}", other),
        }
    }
}
