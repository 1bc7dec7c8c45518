//! A small, self-contained CDCL solver shipped behind the `SatOracle` trait,
//! following the usual assign/clause-database/conflict-analysis split:
//! unit propagation, first-UIP learning, and assumption-based core
//! extraction, with no restarts, no clause deletion, and no preprocessing.
pub mod assign;
pub mod conflict;
pub mod propagate;

use assign::AssignStack;
use propagate::ClauseDb;

use crate::cancel::CancellationToken;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddClauseResult {
    Ok,
    Contradiction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    /// A sufficient (not necessarily minimal) subset of the assumptions
    /// whose conjunction is inconsistent with the clause database. Empty
    /// means the hard part alone is UNSAT.
    Unsat(Vec<Lit>),
    Unknown,
}

/// Operations the engine requires of a SAT solver.
pub trait SatOracle {
    fn new_variable(&mut self) -> VarId;
    fn add_clause(&mut self, lits: &[Lit]) -> AddClauseResult;
    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult;
    fn set_conflict_budget(&mut self, n: u64);
    fn clear_conflict_budget(&mut self);
    fn model_value(&self, var: VarId) -> bool;
    fn set_cancel_token(&mut self, token: CancellationToken);
    fn num_conflicts(&self) -> u64;
}

pub struct CdclOracle {
    asg: AssignStack,
    cdb: ClauseDb,
    conflict_budget: Option<u64>,
    conflicts_this_call: u64,
    total_conflicts: u64,
    cancel: CancellationToken,
}

impl CdclOracle {
    pub fn new() -> Self {
        CdclOracle {
            asg: AssignStack::new(),
            cdb: ClauseDb::new(),
            conflict_budget: None,
            conflicts_this_call: 0,
            total_conflicts: 0,
            cancel: CancellationToken::new(),
        }
    }

    fn budget_exhausted(&self) -> bool {
        matches!(self.conflict_budget, Some(b) if self.conflicts_this_call >= b)
    }

    /// Picks the next decision: the caller's next unassigned assumption, or
    /// (once all assumptions are satisfied) a free branching variable.
    /// Mirrors MiniSat's incremental-assumptions decision loop.
    fn next_decision(&mut self, assumptions: &[Lit]) -> Result<Option<Lit>, Vec<Lit>> {
        while self.asg.decision_level() < assumptions.len() {
            let p = assumptions[self.asg.decision_level()];
            match self.asg.value(p) {
                LTRUE => {
                    self.asg.new_decision_level();
                }
                LFALSE => {
                    return Err(conflict::analyze_final(&self.asg, &self.cdb, &[p]));
                }
                _ => return Ok(Some(p)),
            }
        }
        Ok(self.asg.pick_branch_var().map(|vi| vi.neg_lit()))
    }

    fn propagate_from(&mut self, assumptions: &[Lit]) -> PropagateOutcome {
        loop {
            match propagate::propagate(&mut self.asg, &mut self.cdb) {
                None => return PropagateOutcome::Clean,
                Some(confl) => {
                    if self.asg.decision_level() == 0 {
                        return PropagateOutcome::HardUnsat;
                    }
                    self.conflicts_this_call += 1;
                    self.total_conflicts += 1;
                    let (learnt, btlevel) = conflict::analyze(&mut self.asg, &self.cdb, confl);
                    self.asg.cancel_until(btlevel);
                    if learnt.len() == 1 {
                        self.asg.uncheck_enqueue(learnt[0], None);
                    } else {
                        let cid = self.cdb.attach(learnt.clone(), true);
                        self.asg.uncheck_enqueue(learnt[0], Some(cid));
                    }
                    if self.budget_exhausted() {
                        return PropagateOutcome::BudgetExhausted;
                    }
                }
            }
        }
    }
}

enum PropagateOutcome {
    Clean,
    HardUnsat,
    BudgetExhausted,
}

impl SatOracle for CdclOracle {
    fn new_variable(&mut self) -> VarId {
        let vi = self.asg.num_vars() + 1;
        self.asg.grow_to(vi);
        vi
    }

    fn add_clause(&mut self, lits: &[Lit]) -> AddClauseResult {
        if lits.is_empty() {
            return AddClauseResult::Contradiction;
        }
        // Drop duplicate literals, detect tautologies.
        let mut v: Vec<Lit> = lits.to_vec();
        v.sort_unstable();
        v.dedup();
        for w in v.windows(2) {
            if w[0].vi() == w[1].vi() {
                return AddClauseResult::Ok; // tautological clause: l or ~l
            }
        }
        if v.len() == 1 {
            let l = v[0];
            match self.asg.value(l) {
                LTRUE => return AddClauseResult::Ok,
                LFALSE => return AddClauseResult::Contradiction,
                _ => {
                    self.asg.cancel_until(0);
                    self.asg.uncheck_enqueue(l, None);
                    if let Some(_confl) = propagate::propagate(&mut self.asg, &mut self.cdb) {
                        return AddClauseResult::Contradiction;
                    }
                    return AddClauseResult::Ok;
                }
            }
        }
        self.cdb.attach(v, false);
        AddClauseResult::Ok
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        self.asg.cancel_until(0);
        self.conflicts_this_call = 0;
        loop {
            if self.cancel.is_cancelled() {
                return SolveResult::Unknown;
            }
            match self.propagate_from(assumptions) {
                PropagateOutcome::HardUnsat => return SolveResult::Unsat(Vec::new()),
                PropagateOutcome::BudgetExhausted => return SolveResult::Unknown,
                PropagateOutcome::Clean => {}
            }
            match self.next_decision(assumptions) {
                Err(core) => return SolveResult::Unsat(core),
                Ok(None) => return SolveResult::Sat,
                Ok(Some(lit)) => {
                    self.asg.new_decision_level();
                    self.asg.uncheck_enqueue(lit, None);
                }
            }
        }
    }

    fn set_conflict_budget(&mut self, n: u64) {
        self.conflict_budget = Some(n);
    }

    fn clear_conflict_budget(&mut self) {
        self.conflict_budget = None;
    }

    fn model_value(&self, var: VarId) -> bool {
        self.asg.value(var.pos_lit()) == LTRUE
    }

    fn set_cancel_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    fn num_conflicts(&self) -> u64 {
        self.total_conflicts
    }
}

impl Default for CdclOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(v: &[i32]) -> Vec<Lit> {
        v.iter().map(|&x| int2lit(x)).collect()
    }

    #[test]
    fn solves_trivial_sat() {
        let mut o = CdclOracle::new();
        for _ in 0..2 {
            o.new_variable();
        }
        o.add_clause(&lits(&[1, 2]));
        assert_eq!(o.solve(&[]), SolveResult::Sat);
    }

    #[test]
    fn detects_hard_unsat() {
        let mut o = CdclOracle::new();
        o.new_variable();
        assert_eq!(o.add_clause(&lits(&[1])), AddClauseResult::Ok);
        assert_eq!(o.add_clause(&lits(&[-1])), AddClauseResult::Contradiction);
    }

    #[test]
    fn returns_core_under_assumptions() {
        let mut o = CdclOracle::new();
        o.new_variable();
        let a1 = int2lit(1);
        let na1 = int2lit(-1);
        match o.solve(&[a1, na1]) {
            SolveResult::Unsat(core) => {
                assert!(core.contains(&a1) || core.contains(&na1));
            }
            other => panic!("expected Unsat, got {:?}", other),
        }
    }

    #[test]
    fn multi_level_conflict_learns_without_underflow() {
        // Assumption 1 forces a decision at level 1; (-1 2) and (-1 3) each
        // propagate a new decision level before (-2 -3) conflicts. Exercises
        // `analyze` walking two reason clauses back to the level-1 UIP.
        let mut o = CdclOracle::new();
        for _ in 0..3 {
            o.new_variable();
        }
        o.add_clause(&lits(&[-1, 2]));
        o.add_clause(&lits(&[-1, 3]));
        o.add_clause(&lits(&[-2, -3]));
        match o.solve(&[int2lit(1)]) {
            SolveResult::Unsat(core) => assert!(core.contains(&int2lit(1))),
            other => panic!("expected Unsat, got {:?}", other),
        }
        // The clauses alone (no assumption) are satisfiable.
        assert_eq!(o.solve(&[]), SolveResult::Sat);
    }

    #[test]
    fn idempotent_resolve_same_cost() {
        let mut o = CdclOracle::new();
        for _ in 0..3 {
            o.new_variable();
        }
        o.add_clause(&lits(&[1, 2, 3]));
        o.add_clause(&lits(&[-1, -2]));
        let r1 = o.solve(&[]);
        let r2 = o.solve(&[]);
        assert_eq!(
            std::mem::discriminant(&r1),
            std::mem::discriminant(&r2)
        );
    }
}
