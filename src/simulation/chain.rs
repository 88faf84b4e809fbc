//! Kinematic chains rooted at the ground
//!
//! The pivots of a scene form a graph between solids and the ground. A
//! `ChainTree` is its breadth-first spanning forest: every root is a solid
//! pivoted to the ground, every other node a solid reached through a pivot
//! from its parent. Nodes live in one arena and refer to their parent by
//! index; the arena order is the BFS order.

use std::collections::VecDeque;

use super::states::{ConstraintId, ConstraintKind, SolidId, System};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainNode {
    pub solid: SolidId,
    pub parent: Option<usize>, // index into `ChainTree::nodes`, None for a root
    pub constraint: ConstraintId, // pivot linking the node to its parent (or to ground)
}

#[derive(Debug, Clone, Default)]
pub struct ChainTree {
    pub nodes: Vec<ChainNode>,
    pub loops: Vec<ConstraintId>, // pivots closing a cycle, not part of the tree
}

impl ChainTree {
    /// Build the forest over the active pivots of `sys`
    pub fn build(sys: &System) -> Self {
        let pivots: Vec<_> = sys
            .active_constraints()
            .filter(|(_, c)| matches!(c.kind, ConstraintKind::Pivot))
            .collect();

        let mut tree = ChainTree::default();
        let mut node_of = vec![None; sys.solids.len()];
        let mut used = vec![false; sys.constraints.len()];
        let mut queue = VecDeque::new();

        for (cid, c) in pivots.iter().filter(|(_, c)| c.is_grounded()) {
            used[cid.0] = true;
            let solid = c.object1.solid;
            if node_of[solid.0].is_some() {
                tree.loops.push(*cid);
                continue;
            }
            node_of[solid.0] = Some(tree.nodes.len());
            queue.push_back(tree.nodes.len());
            tree.nodes.push(ChainNode { solid, parent: None, constraint: *cid });
        }

        while let Some(idx) = queue.pop_front() {
            let solid = tree.nodes[idx].solid;
            let next: Vec<_> = pivots
                .iter()
                .filter(|(cid, c)| !used[cid.0] && c.involves(solid))
                .copied()
                .collect();
            for (cid, c) in next {
                used[cid.0] = true;
                let other = match &c.object2 {
                    Some(a) if c.object1.solid == solid => a.solid,
                    _ => c.object1.solid,
                };
                if node_of[other.0].is_some() {
                    tree.loops.push(cid);
                    continue;
                }
                node_of[other.0] = Some(tree.nodes.len());
                queue.push_back(tree.nodes.len());
                tree.nodes.push(ChainNode { solid: other, parent: Some(idx), constraint: cid });
            }
        }

        tree
    }

    pub fn contains(&self, solid: SolidId) -> bool {
        self.nodes.iter().any(|n| n.solid == solid)
    }

    pub fn has_ground(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Number of pivots between `node` and the ground
    pub fn depth(&self, node: usize) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes[node].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.nodes[p].parent;
        }
        depth
    }
}
