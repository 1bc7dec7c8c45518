//! Trail-based assignment stack (`uncheck_enqueue`, `cancel_until`), narrowed
//! to what the oracle actually needs: no elimination, no restarts-aware
//! bookkeeping.
use crate::types::*;

#[derive(Debug, Clone, Copy)]
pub struct VarState {
    pub assign: Lbool,
    pub level: i32,
    pub reason: Option<usize>,
    pub activity: f64,
}

impl Default for VarState {
    fn default() -> Self {
        VarState {
            assign: BOTTOM,
            level: -1,
            reason: None,
            activity: 0.0,
        }
    }
}

/// The mutable search state: variable assignments, the propagation trail and
/// its decision-level boundaries.
pub struct AssignStack {
    pub vars: Vec<VarState>,
    pub trail: Vec<Lit>,
    pub trail_lim: Vec<usize>,
    pub qhead: usize,
}

impl AssignStack {
    pub fn new() -> Self {
        AssignStack {
            vars: vec![VarState::default()], // index 0 unused
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len() - 1
    }

    pub fn grow_to(&mut self, nv: usize) {
        while self.vars.len() <= nv {
            self.vars.push(VarState::default());
        }
    }

    pub fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    pub fn value(&self, l: Lit) -> Lbool {
        let v = &self.vars[l.vi()];
        match v.assign {
            BOTTOM => BOTTOM,
            a if l.positive() => a,
            a => a ^ 1,
        }
    }

    pub fn level_of(&self, vi: VarId) -> i32 {
        self.vars[vi].level
    }

    pub fn reason_of(&self, vi: VarId) -> Option<usize> {
        self.vars[vi].reason
    }

    pub fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    /// Assigns `l` true at the current decision level with the given reason
    /// (`None` for a decision/assumption literal).
    pub fn uncheck_enqueue(&mut self, l: Lit, reason: Option<usize>) {
        let vi = l.vi();
        let dl = self.decision_level() as i32;
        self.vars[vi].assign = if l.positive() { LTRUE } else { LFALSE };
        self.vars[vi].level = dl;
        self.vars[vi].reason = reason;
        self.trail.push(l);
    }

    /// Backjumps to decision level `lv`, unassigning everything above it.
    pub fn cancel_until(&mut self, lv: usize) {
        if self.decision_level() <= lv {
            return;
        }
        let bound = self.trail_lim[lv];
        for i in (bound..self.trail.len()).rev() {
            let vi = self.trail[i].vi();
            self.vars[vi].assign = BOTTOM;
            self.vars[vi].level = -1;
            self.vars[vi].reason = None;
        }
        self.trail.truncate(bound);
        self.trail_lim.truncate(lv);
        self.qhead = self.qhead.min(self.trail.len());
    }

    pub fn bump_activity(&mut self, vi: VarId, inc: f64) {
        self.vars[vi].activity += inc;
    }

    pub fn decay_activity(&mut self, factor: f64) {
        for v in self.vars.iter_mut().skip(1) {
            v.activity *= factor;
        }
    }

    /// Picks an unassigned variable with maximal activity (ties broken by
    /// lowest id), defaulting to its negative polarity.
    pub fn pick_branch_var(&self) -> Option<VarId> {
        let mut best: Option<(VarId, f64)> = None;
        for vi in 1..self.vars.len() {
            if self.vars[vi].assign == BOTTOM {
                let act = self.vars[vi].activity;
                if best.map_or(true, |(_, a)| act > a) {
                    best = Some((vi, act));
                }
            }
        }
        best.map(|(vi, _)| vi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_and_cancel() {
        let mut a = AssignStack::new();
        a.grow_to(3);
        a.new_decision_level();
        a.uncheck_enqueue(int2lit(1), None);
        a.new_decision_level();
        a.uncheck_enqueue(int2lit(-2), None);
        assert_eq!(a.value(int2lit(1)), LTRUE);
        assert_eq!(a.value(int2lit(2)), LFALSE);
        a.cancel_until(1);
        assert_eq!(a.value(int2lit(1)), LTRUE);
        assert_eq!(a.value(int2lit(2)), BOTTOM);
        a.cancel_until(0);
        assert_eq!(a.value(int2lit(1)), BOTTOM);
    }
}
