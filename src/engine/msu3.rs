//! Unweighted core-guided engine, MSU3-style. A single totalizer tracks
//! "how many activated soft clauses are currently excused"; every core
//! raises the bound by exactly one.
use std::collections::{HashMap, HashSet};

use super::{contract_violation, ensure_relaxation_vars, CoreGuidedStrategy};
use crate::error::Result;
use crate::formula::Formula;
use crate::oracle::SatOracle;
use crate::totalizer::Totalizer;
use crate::types::*;

pub struct Msu3Strategy {
    universe: Vec<usize>,
    active: HashSet<usize>,
    lb: Weight,
    totalizer: Totalizer,
    bound_lit: Option<Lit>,
}

impl Msu3Strategy {
    pub fn new(formula: &mut Formula, oracle: &mut dyn SatOracle, indices: &[usize]) -> Self {
        ensure_relaxation_vars(formula, oracle, indices);
        Msu3Strategy {
            universe: indices.to_vec(),
            active: HashSet::new(),
            lb: 0,
            totalizer: Totalizer::new(),
            bound_lit: None,
        }
    }
}

impl Msu3Strategy {
    pub fn has_encoding(&self) -> bool {
        self.totalizer.has_encoding
    }

    pub fn totalizer(&self) -> &Totalizer {
        &self.totalizer
    }

    /// Folds `other`'s state into `self` (the merging partition absorbs the
    /// merged-away one): raw relaxation literals join in directly when
    /// `other` has no encoding
    /// yet; otherwise `other`'s totalizer *outputs* are joined in, which
    /// preserves its already-built structure at the cost of some redundancy.
    pub fn absorb(&mut self, other: &Msu3Strategy, formula: &Formula, oracle: &mut dyn SatOracle) {
        let new_lb = self.lb + other.lb;
        if other.has_encoding() {
            self.totalizer.join_outputs_of(&other.totalizer, new_lb as usize, oracle);
        } else {
            let extra: Vec<Lit> = other
                .active
                .iter()
                .map(|&i| formula.soft[i].relaxation_lit().unwrap())
                .collect();
            if !extra.is_empty() {
                if self.totalizer.has_encoding {
                    self.totalizer.join(&extra, new_lb as usize, oracle);
                } else {
                    self.totalizer.build(&extra, new_lb as usize, oracle);
                }
            }
        }
        self.lb = new_lb;
        self.universe.extend(other.universe.iter().copied());
        self.active.extend(other.active.iter().copied());
        self.bound_lit = self.totalizer.inc_update(new_lb as usize, oracle);
    }
}

impl CoreGuidedStrategy for Msu3Strategy {
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
        if let Some(l) = self.bound_lit {
            out.push(l);
        }
        out
    }

    fn activate_core(&mut self, core: &[Lit], formula: &mut Formula, oracle: &mut dyn SatOracle) -> Result<()> {
        let lit_to_idx: HashMap<Lit, usize> = self
            .universe
            .iter()
            .filter_map(|&i| formula.soft[i].assumption_lit().map(|l| (l, i)))
            .collect();

        let mut newly: Vec<Lit> = Vec::new();
        for &lit in core {
            if let Some(&idx) = lit_to_idx.get(&lit) {
                if self.active.insert(idx) {
                    newly.push(formula.soft[idx].relaxation_lit().unwrap());
                }
            }
        }
        let recognized = !newly.is_empty() || core.iter().any(|&l| Some(l) == self.bound_lit);
        if !recognized {
            return Err(contract_violation(
                "unsat core literal matched neither a soft assumption nor the totalizer bound",
            ));
        }

        self.lb += 1;
        if !self.totalizer.has_encoding {
            self.totalizer.build(&newly, self.lb as usize, oracle);
        } else if !newly.is_empty() {
            self.totalizer.join(&newly, self.lb as usize, oracle);
        }
        self.bound_lit = self.totalizer.inc_update(self.lb as usize, oracle);
        Ok(())
    }

    fn lb(&self) -> Weight {
        self.lb
    }
}
