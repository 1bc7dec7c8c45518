//! Conflict analysis: first-UIP clause learning and `analyzeFinal`-style
//! core extraction. Resolves backward over the trail until the first unique
//! implication point, bumping the activity of each resolved variable.
use super::assign::AssignStack;
use super::propagate::ClauseDb;
use crate::types::*;

/// Resolves the conflicting clause back to its first unique implication
/// point. Returns the learnt clause (asserting literal at index 0) and the
/// decision level to backjump to.
pub fn analyze(asg: &mut AssignStack, cdb: &ClauseDb, confl: usize) -> (Vec<Lit>, usize) {
    let mut seen = vec![false; asg.vars.len()];
    let mut learnt: Vec<Lit> = vec![NULL_LIT];
    let mut counter = 0usize;
    let mut p: Option<Lit> = None;
    let mut idx = asg.trail.len();
    let mut confl_clause = confl;
    let cur_level = asg.decision_level() as i32;

    loop {
        let lits = cdb.clauses[confl_clause].lits.clone();
        let start = if p.is_none() { 0 } else { 1 };
        for &q in lits.iter().skip(start) {
            let vi = q.vi();
            if !seen[vi] && asg.level_of(vi) > 0 {
                seen[vi] = true;
                asg.bump_activity(vi, 1.0);
                if asg.level_of(vi) >= cur_level {
                    counter += 1;
                } else {
                    learnt.push(q);
                }
            }
        }
        loop {
            idx -= 1;
            if seen[asg.trail[idx].vi()] {
                break;
            }
        }
        let vi = asg.trail[idx].vi();
        p = Some(asg.trail[idx]);
        seen[vi] = false;
        counter -= 1;
        if counter == 0 {
            break;
        }
        confl_clause = asg
            .reason_of(vi)
            .expect("a resolved literal below the UIP must have a reason clause");
    }
    learnt[0] = p.unwrap().negate();

    let mut btlevel = 0usize;
    if learnt.len() > 1 {
        let mut max_i = 1;
        for i in 2..learnt.len() {
            if asg.level_of(learnt[i].vi()) > asg.level_of(learnt[max_i].vi()) {
                max_i = i;
            }
        }
        learnt.swap(1, max_i);
        btlevel = asg.level_of(learnt[1].vi()) as usize;
    }
    asg.decay_activity(0.95);
    (learnt, btlevel)
}

/// `analyzeFinal`: given the literals of a clause (or a single falsified
/// assumption) that just caused a conflict while decisions on the trail are
/// still exactly the caller's assumption literals, walks the implication
/// graph backward and collects the assumption literals on the resolution
/// path. The result is a sufficient (not necessarily minimal) subset of
/// the falsified assumptions.
pub fn analyze_final(asg: &AssignStack, cdb: &ClauseDb, confl_lits: &[Lit]) -> Vec<Lit> {
    let mut seen = vec![false; asg.vars.len()];
    let mut core: Vec<Lit> = confl_lits.to_vec();
    for &l in confl_lits {
        seen[l.vi()] = true;
    }
    if asg.trail_lim.is_empty() {
        return core;
    }
    let start = asg.trail_lim[0];
    for i in (start..asg.trail.len()).rev() {
        let vi = asg.trail[i].vi();
        if seen[vi] {
            match asg.reason_of(vi) {
                None => {
                    if asg.level_of(vi) > 0 {
                        core.push(asg.trail[i]);
                    }
                }
                Some(cid) => {
                    for &lit in cdb.clauses[cid].lits[1..].iter() {
                        if asg.level_of(lit.vi()) > 0 {
                            seen[lit.vi()] = true;
                        }
                    }
                }
            }
            seen[vi] = false;
        }
    }
    core
}
