//! Clause storage and two-watched-literal unit propagation via a
//! watch-list attach/detach pattern.
use super::assign::AssignStack;
use crate::types::*;

/// A stored clause. The first two literals are always the watched pair.
pub struct StoredClause {
    pub lits: Vec<Lit>,
    pub learnt: bool,
}

pub struct ClauseDb {
    pub clauses: Vec<StoredClause>,
    /// `watches[lit]` lists the ids of clauses watching `lit`: clauses that
    /// must be revisited when `lit` becomes false.
    pub watches: Vec<Vec<usize>>,
}

impl ClauseDb {
    pub fn new() -> Self {
        ClauseDb {
            clauses: Vec::new(),
            watches: Vec::new(),
        }
    }

    fn ensure_watch_capacity(&mut self, lit: Lit) {
        let idx = lit as usize;
        if self.watches.len() <= idx {
            self.watches.resize_with(idx + 1, Vec::new);
        }
    }

    /// Registers a (size >= 2) clause's first two literals as its watches.
    /// Returns the new clause's id.
    pub fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> usize {
        debug_assert!(lits.len() >= 2);
        let id = self.clauses.len();
        self.ensure_watch_capacity(lits[0]);
        self.ensure_watch_capacity(lits[1]);
        self.watches[lits[0] as usize].push(id);
        self.watches[lits[1] as usize].push(id);
        self.clauses.push(StoredClause { lits, learnt });
        id
    }
}

/// The outcome of unit propagation: `None` if it ran to fixpoint, or the id
/// of a falsified clause.
pub fn propagate(asg: &mut AssignStack, cdb: &mut ClauseDb) -> Option<usize> {
    while asg.qhead < asg.trail.len() {
        let p = asg.trail[asg.qhead];
        asg.qhead += 1;
        let falsified = p.negate();
        let idx = falsified as usize;
        if idx >= cdb.watches.len() {
            continue;
        }
        let old = std::mem::take(&mut cdb.watches[idx]);
        let mut kept = Vec::with_capacity(old.len());
        let mut conflict = None;
        let mut i = 0;
        while i < old.len() {
            let cid = old[i];
            i += 1;
            // Normalize so lits[0] is the watch that just became false.
            if cdb.clauses[cid].lits[0] != falsified {
                cdb.clauses[cid].lits.swap(0, 1);
            }
            let other = cdb.clauses[cid].lits[1];
            if asg.value(other) == LTRUE {
                kept.push(cid);
                continue;
            }
            let mut found = None;
            for k in 2..cdb.clauses[cid].lits.len() {
                let cand = cdb.clauses[cid].lits[k];
                if asg.value(cand) != LFALSE {
                    found = Some(k);
                    break;
                }
            }
            if let Some(k) = found {
                let new_watch = cdb.clauses[cid].lits[k];
                cdb.clauses[cid].lits.swap(0, k);
                cdb.ensure_watch_capacity(new_watch);
                cdb.watches[new_watch as usize].push(cid);
            } else if asg.value(other) == LFALSE {
                // Conflict: restore the remaining unprocessed watchers.
                kept.push(cid);
                kept.extend_from_slice(&old[i..]);
                conflict = Some(cid);
                break;
            } else {
                // Unit under this clause: move the asserting literal to
                // index 0 (MiniSat convention — reason clauses carry the
                // implied literal first, false antecedents after) so
                // conflict analysis can walk `lits[1..]` as the antecedents.
                cdb.clauses[cid].lits.swap(0, 1);
                let implied = cdb.clauses[cid].lits[0];
                asg.uncheck_enqueue(implied, Some(cid));
                kept.push(cid);
            }
        }
        cdb.watches[idx] = kept;
        if let Some(cid) = conflict {
            return Some(cid);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(v: &[i32]) -> Vec<Lit> {
        v.iter().map(|&x| int2lit(x)).collect()
    }

    #[test]
    fn unit_propagation_chains() {
        let mut asg = AssignStack::new();
        asg.grow_to(3);
        let mut cdb = ClauseDb::new();
        // (-1 v 2), (-2 v 3): asserting 1 should force 2, then 3.
        cdb.attach(lits(&[-1, 2]), false);
        cdb.attach(lits(&[-2, 3]), false);
        asg.new_decision_level();
        asg.uncheck_enqueue(int2lit(1), None);
        let confl = propagate(&mut asg, &mut cdb);
        assert!(confl.is_none());
        assert_eq!(asg.value(int2lit(2)), LTRUE);
        assert_eq!(asg.value(int2lit(3)), LTRUE);
    }

    #[test]
    fn propagation_detects_conflict() {
        let mut asg = AssignStack::new();
        asg.grow_to(2);
        let mut cdb = ClauseDb::new();
        cdb.attach(lits(&[-1, 2]), false);
        cdb.attach(lits(&[-1, -2]), false);
        asg.new_decision_level();
        asg.uncheck_enqueue(int2lit(1), None);
        asg.new_decision_level();
        asg.uncheck_enqueue(int2lit(2), None);
        let confl = propagate(&mut asg, &mut cdb);
        assert!(confl.is_some());
    }
}
