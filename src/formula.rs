//! The mutable MaxSAT instance: hard clauses, soft clauses with weight and
//! optional partition, and the running cost bookkeeping. Parsing/writing
//! lives in `formula::io`.
pub mod io;

use crate::types::*;

#[derive(Debug, Clone)]
pub struct SoftClause {
    pub lits: Vec<Lit>,
    pub weight: Weight,
    pub partition_id: Option<PartitionId>,
    /// Set lazily by the engine: a fresh variable appended to `lits` inside
    /// the oracle so forcing it true falsifies the clause.
    pub relaxation_var: Option<VarId>,
}

impl SoftClause {
    pub fn new(lits: Vec<Lit>, weight: Weight, partition_id: Option<PartitionId>) -> Self {
        SoftClause {
            lits,
            weight,
            partition_id,
            relaxation_var: None,
        }
    }

    /// The assumption literal for this clause: equal to the relaxation
    /// variable's positive literal in every current engine.
    pub fn assumption_lit(&self) -> Option<Lit> {
        self.relaxation_var.map(|v| v.pos_lit())
    }

    pub fn relaxation_lit(&self) -> Option<Lit> {
        self.assumption_lit()
    }
}

#[derive(Debug, Clone)]
pub struct HardClause {
    pub lits: Vec<Lit>,
    pub partition_id: Option<PartitionId>,
}

/// The relation of a linear pseudo-Boolean constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbOp {
    Le,
    Ge,
    Eq,
}

/// A pseudo-Boolean side constraint `sum(coeff_i * [lit_i]) <op> bound`,
/// carried for verification even when the terms don't admit the cheap
/// all-unit-coefficient clause encoding `encode_linear_constraint` builds.
#[derive(Debug, Clone)]
pub struct PbConstraint {
    pub terms: Vec<(i64, Lit)>,
    pub op: PbOp,
    pub bound: i64,
}

impl PbConstraint {
    pub fn satisfied_by(&self, model: &[bool]) -> bool {
        let sum: i64 = self
            .terms
            .iter()
            .map(|&(c, l)| {
                let v = l.vi();
                let true_now = v < model.len() + 1 && model[v - 1] == l.positive();
                if true_now {
                    c
                } else {
                    0
                }
            })
            .sum();
        match self.op {
            PbOp::Le => sum <= self.bound,
            PbOp::Ge => sum >= self.bound,
            PbOp::Eq => sum == self.bound,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formula {
    pub num_vars: usize,
    pub hard: Vec<HardClause>,
    pub soft: Vec<SoftClause>,
    pub hard_weight: Weight,
    pub n_partitions: usize,
    /// Pseudo-Boolean/cardinality side constraints from OPB input that
    /// aren't asserted in the oracle (general PB-to-CNF encoding is out of
    /// scope) but must still hold of any reported incumbent.
    pub pb_constraints: Vec<PbConstraint>,
}

impl Formula {
    pub fn new(num_vars: usize, hard_weight: Weight) -> Self {
        Formula {
            num_vars,
            hard: Vec::new(),
            soft: Vec::new(),
            hard_weight,
            n_partitions: 0,
            pb_constraints: Vec::new(),
        }
    }

    pub fn problem_type(&self) -> ProblemType {
        if self.soft.iter().all(|s| s.weight == 1) {
            ProblemType::Unweighted
        } else {
            ProblemType::Weighted
        }
    }

    pub fn sum_of_soft_weights(&self) -> Weight {
        self.soft.iter().map(|s| s.weight).sum()
    }

    /// Partition id treated as "no user partition", the overflow partition
    /// that collects soft clauses not assigned a user partition.
    pub fn overflow_partition(&self) -> PartitionId {
        self.n_partitions
    }

    pub fn effective_partition(&self, id: Option<PartitionId>) -> PartitionId {
        id.unwrap_or_else(|| self.overflow_partition())
    }

    /// BMO applicability test: weights must form a strictly decreasing,
    /// dominance-respecting sequence.
    pub fn is_bmo_applicable(&self) -> bool {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<Weight, u64> = BTreeMap::new();
        for s in &self.soft {
            *counts.entry(s.weight).or_insert(0) += 1;
        }
        let mut levels: Vec<(Weight, u64)> = counts.into_iter().collect();
        levels.sort_by(|a, b| b.0.cmp(&a.0)); // descending by weight
        for (i, &(w, _)) in levels.iter().enumerate() {
            let tail: u128 = levels[i + 1..]
                .iter()
                .map(|&(wj, nj)| wj as u128 * nj as u128)
                .sum();
            if (w as u128) <= tail {
                return false;
            }
        }
        true
    }

    /// Verifies every hard clause is satisfied by `model`.
    pub fn hard_clauses_satisfied(&self, model: &[bool]) -> bool {
        self.hard.iter().all(|c| {
            c.lits.iter().any(|&l| {
                let v = l.vi();
                v < model.len() + 1 && (model[v - 1] == l.positive())
            })
        })
    }

    /// Verifies every stored PB/cardinality side constraint is satisfied.
    pub fn pb_constraints_satisfied(&self, model: &[bool]) -> bool {
        self.pb_constraints.iter().all(|c| c.satisfied_by(model))
    }

    /// The full incumbent-soundness check: hard clauses plus any explicit
    /// PB/cardinality side constraint.
    pub fn incumbent_is_sound(&self, model: &[bool]) -> bool {
        self.hard_clauses_satisfied(model) && self.pb_constraints_satisfied(model)
    }

    pub fn cost_of(&self, model: &[bool]) -> Weight {
        self.soft
            .iter()
            .filter(|s| {
                !s.lits.iter().any(|&l| {
                    let v = l.vi();
                    v < model.len() + 1 && (model[v - 1] == l.positive())
                })
            })
            .map(|s| s.weight)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_soft(x: i32, w: Weight) -> SoftClause {
        SoftClause::new(vec![int2lit(x)], w, None)
    }

    #[test]
    fn unweighted_detection() {
        let mut f = Formula::new(2, 1000);
        f.soft.push(unit_soft(1, 1));
        f.soft.push(unit_soft(-1, 1));
        assert_eq!(f.problem_type(), ProblemType::Unweighted);
        f.soft.push(unit_soft(2, 3));
        assert_eq!(f.problem_type(), ProblemType::Weighted);
    }

    #[test]
    fn bmo_structure_detected() {
        let mut f = Formula::new(3, 1000);
        f.soft.push(unit_soft(1, 100));
        f.soft.push(unit_soft(2, 10));
        f.soft.push(unit_soft(3, 10));
        f.soft.push(unit_soft(-3, 1));
        // 100 > 10*2 + 1*1 = 21, 10 > 10*1 + 1*1 = 11? no: second level must
        // dominate the tail strictly too: 10 <= 11 -> not BMO.
        assert!(!f.is_bmo_applicable());
    }

    #[test]
    fn bmo_structure_accepted() {
        let mut f = Formula::new(3, 1000);
        f.soft.push(unit_soft(1, 100));
        f.soft.push(unit_soft(2, 10));
        f.soft.push(unit_soft(-2, 1));
        // 100 > 10 + 1 = 11; 10 > 1. BMO applies.
        assert!(f.is_bmo_applicable());
    }

    #[test]
    fn pb_constraint_checked_against_incumbent() {
        // x1 + x2 <= 1: at most one of the two may be true.
        let mut f = Formula::new(2, 1000);
        f.pb_constraints.push(PbConstraint {
            terms: vec![(1, int2lit(1)), (1, int2lit(2))],
            op: PbOp::Le,
            bound: 1,
        });
        assert!(f.incumbent_is_sound(&[true, false]));
        assert!(!f.incumbent_is_sound(&[true, true]));
    }

    #[test]
    fn cost_counts_violated_weight() {
        let mut f = Formula::new(1, 1000);
        f.soft.push(unit_soft(1, 1));
        f.soft.push(unit_soft(-1, 3));
        let model = vec![true]; // var 1 = true
        assert_eq!(f.cost_of(&model), 3); // the `-1` soft clause is violated
    }
}
