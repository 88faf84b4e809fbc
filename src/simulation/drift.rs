//! Positional drift correction
//!
//! Constraints are only enforced on accelerations, so the attachment points
//! of a pivot slowly separate as steps accumulate. After each integration the
//! dependent body of every pivot is translated so the two points coincide
//! again. Velocities are left alone.
//!
//! Pivots are visited along the `ChainTree`, ground first, and the body
//! farther from the ground is the one that moves; a single pass is then a
//! fixed point. Pivots off the tree (no grounded chain reaches them) fall back
//! to "object2 follows object1" in declaration order.

use tracing::debug;

use super::assembler::slider_frame;
use super::chain::ChainTree;
use super::geometry::NVec3;
use super::params::DriftCoverage;
use super::states::{ConstraintKind, System};

/// Largest correction applied by the last pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftReport {
    pub max_correction: f64,
    pub corrected: usize,
}

impl DriftReport {
    fn record(&mut self, delta: &NVec3) {
        self.max_correction = self.max_correction.max(delta.norm());
        self.corrected += 1;
    }
}

/// Run one drift-correction pass over the constraint kinds in `coverage`
pub fn correct_drift(sys: &mut System, coverage: DriftCoverage) -> DriftReport {
    let mut report = DriftReport::default();
    if coverage.pivots {
        correct_pivots(sys, &mut report);
    }
    if coverage.sliders {
        correct_sliders(sys, &mut report);
    }
    report
}

fn correct_pivots(sys: &mut System, report: &mut DriftReport) {
    let tree = ChainTree::build(sys);

    for node in &tree.nodes {
        let c = sys.constraint(node.constraint);
        let (target, moving) = match (&c.object2, node.parent) {
            (None, _) => (c.initial_position, c.object1),
            (Some(a2), Some(_)) if a2.solid == node.solid => (sys.attachment_world(&c.object1), *a2),
            (Some(a2), _) => (sys.attachment_world(a2), c.object1),
        };
        let delta = target - sys.attachment_world(&moving);
        sys.solids[moving.solid.0].position += delta;
        report.record(&delta);
    }

    for cid in &tree.loops {
        debug!(constraint = %sys.constraint(*cid).name, "pivot closes a loop, not drift-corrected");
    }

    // pivots on chains that never reach the ground
    let floating: Vec<_> = sys
        .active_constraints()
        .filter(|(_, c)| matches!(c.kind, ConstraintKind::Pivot))
        .filter(|(cid, c)| !tree.contains(c.object1.solid) && !tree.loops.contains(cid))
        .map(|(cid, _)| cid)
        .collect();
    for cid in floating {
        let c = sys.constraint(cid);
        if let Some(a2) = c.object2 {
            let delta = sys.attachment_world(&c.object1) - sys.attachment_world(&a2);
            sys.solids[a2.solid.0].position += delta;
            report.record(&delta);
        }
    }
}

/// Slide object1 back onto the slider line along its normal. Bodies already
/// placed by a grounded pivot chain are left to it.
fn correct_sliders(sys: &mut System, report: &mut DriftReport) {
    let tree = ChainTree::build(sys);
    let sliders: Vec<_> = sys
        .active_constraints()
        .filter(|(_, c)| !tree.contains(c.object1.solid))
        .filter_map(|(cid, c)| match c.kind {
            ConstraintKind::Slider { axis } => Some((cid, axis)),
            ConstraintKind::Pivot => None,
        })
        .collect();

    for (cid, axis) in sliders {
        let c = sys.constraint(cid);
        let (_, n) = slider_frame(sys, c, &axis);
        let on_line = match &c.object2 {
            Some(a2) => sys.attachment_world(a2),
            None => c.initial_position,
        };
        let offset = n.dot(&(sys.attachment_world(&c.object1) - on_line));
        let delta = -offset * n;
        let moving = c.object1.solid;
        sys.solids[moving.0].position += delta;
        report.record(&delta);
    }
}
