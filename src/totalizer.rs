//! Incremental totalizer cardinality encoder. Tree nodes live in a flat
//! arena so the tree never needs self-referential ownership.
use crate::oracle::{AddClauseResult, SatOracle};
use crate::types::*;

pub type NodeId = usize;

/// One node of the totalizer tree. Leaves have `inputs.len() == 1` and no
/// children; internal nodes merge their two children's outputs.
pub struct TotalizerNode {
    pub inputs: Vec<Lit>,
    /// `outputs[j-1]` is $o_j$: "at least j of `inputs` are true".
    pub outputs: Vec<Lit>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Highest output index for which merge clauses have been materialized.
    pub explained_up_to: usize,
}

impl TotalizerNode {
    fn leaf(lit: Lit) -> Self {
        TotalizerNode {
            inputs: vec![lit],
            outputs: vec![lit],
            left: None,
            right: None,
            explained_up_to: 1,
        }
    }
}

/// Encodes $\sum_{x \in \text{inputs}} x \le k$ for a growing `k`, over an
/// arena of nodes rooted at `root`.
pub struct Totalizer {
    pub nodes: Vec<TotalizerNode>,
    pub root: Option<NodeId>,
    pub bound: usize,
    pub has_encoding: bool,
}

impl Totalizer {
    pub fn new() -> Self {
        Totalizer {
            nodes: Vec::new(),
            root: None,
            bound: 0,
            has_encoding: false,
        }
    }

    pub fn inputs(&self) -> &[Lit] {
        match self.root {
            Some(r) => &self.nodes[r].inputs,
            None => &[],
        }
    }

    fn new_node(&mut self, inputs: Vec<Lit>, outputs: Vec<Lit>, l: NodeId, r: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TotalizerNode {
            inputs,
            outputs,
            left: Some(l),
            right: Some(r),
            explained_up_to: 0,
        });
        id
    }

    fn new_leaf(&mut self, lit: Lit) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TotalizerNode::leaf(lit));
        id
    }

    /// Builds a balanced binary tree of leaves, without materializing any
    /// merge clauses yet (that's `inc_update`'s job).
    fn build_tree(&mut self, leaves: &[NodeId]) -> NodeId {
        if leaves.len() == 1 {
            return leaves[0];
        }
        let mid = leaves.len() / 2;
        let l = self.build_tree(&leaves[..mid]);
        let r = self.build_tree(&leaves[mid..]);
        let n = self.nodes[l].inputs.len() + self.nodes[r].inputs.len();
        let mut inputs = self.nodes[l].inputs.clone();
        inputs.extend_from_slice(&self.nodes[r].inputs);
        self.new_node(inputs, Vec::with_capacity(n), l, r)
    }

    /// Allocates fresh output literals for `node` up to `want` (capped at
    /// the node's input count), mutating `oracle` for the new variables.
    fn ensure_outputs(&mut self, node: NodeId, want: usize, oracle: &mut dyn SatOracle) {
        let cap = self.nodes[node].inputs.len();
        let want = want.min(cap);
        while self.nodes[node].outputs.len() < want {
            let v = oracle.new_variable();
            self.nodes[node].outputs.push(v.pos_lit());
        }
    }

    /// Materializes merge clauses at `node` for output indices in
    /// `old_up_to+1 ..= new_up_to` (1-indexed), given its children already
    /// have the outputs required to define them.
    fn materialize_merge(&mut self, node: NodeId, new_up_to: usize, oracle: &mut dyn SatOracle) {
        let (left, right) = match (self.nodes[node].left, self.nodes[node].right) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                // Leaf: its single output literal *is* its input; nothing to
                // merge, but record progress.
                self.nodes[node].explained_up_to = new_up_to.min(1);
                return;
            }
        };
        let p = self.nodes[left].outputs.len();
        let q = self.nodes[right].outputs.len();
        let old_up_to = self.nodes[node].explained_up_to;
        for j in (old_up_to + 1)..=new_up_to {
            // o_j <=> at least j inputs true. Upward direction only:
            // o_j is implied whenever a+b == j for some valid split.
            for a in 0..=p.min(j) {
                let b = j - a;
                if b > q {
                    continue;
                }
                if a == 0 && b == 0 {
                    continue;
                }
                let left_lit = if a == 0 { None } else { Some(self.nodes[left].outputs[a - 1]) };
                let right_lit = if b == 0 { None } else { Some(self.nodes[right].outputs[b - 1]) };
                let out = self.nodes[node].outputs[j - 1];
                let mut clause: Vec<Lit> = Vec::with_capacity(3);
                if let Some(l) = left_lit {
                    clause.push(l.negate());
                }
                if let Some(r) = right_lit {
                    clause.push(r.negate());
                }
                clause.push(out);
                oracle.add_clause(&clause);
            }
        }
        self.nodes[node].explained_up_to = new_up_to;
    }

    /// Recursively ensures outputs/merge clauses for `node` and its subtree
    /// are materialized up to bound `k` (capped at the node's input count).
    fn grow_node(&mut self, node: NodeId, k: usize, oracle: &mut dyn SatOracle) {
        let cap = self.nodes[node].inputs.len();
        let want = k.min(cap);
        if let (Some(l), Some(r)) = (self.nodes[node].left, self.nodes[node].right) {
            self.grow_node(l, want, oracle);
            self.grow_node(r, want, oracle);
        }
        self.ensure_outputs(node, want, oracle);
        self.materialize_merge(node, want, oracle);
    }

    /// Builds the tree over `inputs` and materializes outputs/clauses up to
    /// bound `k`.
    pub fn build(&mut self, inputs: &[Lit], k: usize, oracle: &mut dyn SatOracle) {
        debug_assert!(self.root.is_none());
        if inputs.is_empty() {
            return;
        }
        let leaves: Vec<NodeId> = inputs.iter().map(|&l| self.new_leaf(l)).collect();
        let root = self.build_tree(&leaves);
        self.root = Some(root);
        self.has_encoding = true;
        self.bound = 0;
        self.inc_update(k, oracle);
    }

    /// Grows the materialized prefix to bound `k` (a no-op if already there
    /// or beyond the total input count). Returns the assumption literal
    /// asserting "at most k inputs are true", or `None` if `k` already
    /// exceeds the input count (the constraint is then trivially true).
    pub fn inc_update(&mut self, k: usize, oracle: &mut dyn SatOracle) -> Option<Lit> {
        let root = self.root?;
        let n = self.nodes[root].inputs.len();
        if k >= n {
            self.bound = k;
            return None;
        }
        if k + 1 > self.bound || !self.node_materialized(root, k + 1) {
            self.grow_node(root, k + 1, oracle);
        }
        self.bound = k.max(self.bound);
        Some(self.nodes[root].outputs[k].negate())
    }

    fn node_materialized(&self, node: NodeId, up_to: usize) -> bool {
        self.nodes[node].explained_up_to >= up_to.min(self.nodes[node].inputs.len())
    }

    /// Extends the encoding with `extra_inputs` by building a right-hand
    /// sibling node and merging it with the existing root, preserving the
    /// already-built structure.
    pub fn join(&mut self, extra_inputs: &[Lit], k: usize, oracle: &mut dyn SatOracle) -> Option<Lit> {
        if extra_inputs.is_empty() {
            return self.inc_update(k, oracle);
        }
        let new_leaves: Vec<NodeId> = extra_inputs.iter().map(|&l| self.new_leaf(l)).collect();
        let right = self.build_tree(&new_leaves);
        match self.root {
            None => {
                self.root = Some(right);
                self.has_encoding = true;
                self.bound = 0;
            }
            Some(old_root) => {
                let n = self.nodes[old_root].inputs.len() + self.nodes[right].inputs.len();
                let mut inputs = self.nodes[old_root].inputs.clone();
                inputs.extend_from_slice(&self.nodes[right].inputs);
                let new_root = self.new_node(inputs, Vec::with_capacity(n), old_root, right);
                self.root = Some(new_root);
            }
        }
        self.inc_update(k, oracle)
    }

    /// Joins another totalizer's *output literals* (already materialized up
    /// to its own bound) into this one as fresh inputs, used when a merged
    /// partition already had an encoding.
    pub fn join_outputs_of(&mut self, other: &Totalizer, k: usize, oracle: &mut dyn SatOracle) -> Option<Lit> {
        let outs: Vec<Lit> = other.outputs().to_vec();
        self.join(&outs, k, oracle)
    }

    /// The currently materialized prefix of root output literals.
    pub fn outputs(&self) -> &[Lit] {
        match self.root {
            Some(r) => &self.nodes[r].outputs,
            None => &[],
        }
    }
}

impl Default for Totalizer {
    fn default() -> Self {
        Self::new()
    }
}
