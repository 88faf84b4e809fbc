//! Equation sources for the per-step linear system
//!
//! Each source implements [`EquationSource`] and appends its rows for the
//! current state of the [`System`]; an [`EquationSet`] runs them in order.
//!
//! Unknowns are `ax, ay, α` per solid and `Fx, Fy` per active constraint.
//! `F` is the load the constraint applies to object1; object2 receives the
//! opposite. Pivots and sliders transmit no torque, so no `T` unknown is
//! ever introduced and `torque_applied_to_first_object` stays zero.

use tracing::debug;

use super::equations::{Equation, EquationTerm, UnknownFactor};
use super::geometry::{perp, NVec3};
use super::states::{Constraint, ConstraintId, ConstraintKind, SolidId, System};

/// Collection of equation sources (dynamics, kinematics, load restrictions)
/// whose rows together form the square system for one step
pub struct EquationSet {
    sources: Vec<Box<dyn EquationSource + Send + Sync>>,
}

impl EquationSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Add an equation source
    pub fn with<T>(mut self, source: T) -> Self
    where
        T: EquationSource + Send + Sync + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }

    /// Newton and Euler equations per solid plus the constraint rows
    pub fn standard(gravity: f64) -> Self {
        Self::new()
            .with(ForceBalance { gravity })
            .with(MomentBalance)
            .with(ConstraintKinematics)
            .with(DegreesOfFreedom)
    }

    /// Build every row for the current state of `sys`
    pub fn assemble(&self, sys: &System) -> Vec<Equation> {
        let mut out = Vec::with_capacity(expected_rows(sys));
        for source in &self.sources {
            source.equations(sys, &mut out);
        }
        debug!(rows = out.len(), solids = sys.solids.len(), "assembled equations");
        out
    }
}

impl Default for EquationSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for contributors of linear equations on [`System`]
pub trait EquationSource {
    fn equations(&self, sys: &System, out: &mut Vec<Equation>);
}

/// Rows (and unknowns) a well-formed scene produces: 3 per solid plus, per
/// active constraint, its kinematic and load-restriction rows
pub fn expected_rows(sys: &System) -> usize {
    3 * sys.solids.len()
        + sys
            .active_constraints()
            .map(|(_, c)| c.kind.kinematic_rows() + c.kind.dof_rows())
            .sum::<usize>()
}

/// Unit slider axis and its normal in world frame at the current heading of
/// object2 (or as configured when grounded)
pub fn slider_frame(sys: &System, c: &Constraint, axis: &NVec3) -> (NVec3, NVec3) {
    let local = axis.normalize();
    let u = match &c.object2 {
        Some(a) => sys.solid(a.solid).lever_arm(&local),
        None => local,
    };
    (u, perp(&u))
}

/// Lever arm from `solid`'s center of mass to where constraint `c` loads it
fn lever_for(sys: &System, c: &Constraint, solid: SolidId) -> NVec3 {
    let body = sys.solid(solid);
    if c.object1.solid == solid {
        return body.lever_arm(&c.object1.position);
    }
    match (&c.kind, &c.object2) {
        (ConstraintKind::Pivot, Some(a)) => body.lever_arm(&a.position),
        // the load passes through object1's point wherever it slid to
        (ConstraintKind::Slider { .. }, Some(_)) => sys.attachment_world(&c.object1) - body.position,
        (_, None) => NVec3::zeros(),
    }
}

/// Newton's second law along x and y for each solid, gravity along -y
pub struct ForceBalance {
    pub gravity: f64,
}

impl EquationSource for ForceBalance {
    fn equations(&self, sys: &System, out: &mut Vec<Equation>) {
        for id in sys.solid_ids() {
            let solid = sys.solid(id);

            // m ax - Σ ±Fx = 0
            let mut x = Equation::new(format!("force x of {}", solid.name))
                .with(EquationTerm::solid(UnknownFactor::AccelX, id, solid.mass));
            // m ay - Σ ±Fy + m g = 0
            let mut y = Equation::new(format!("force y of {}", solid.name))
                .with(EquationTerm::solid(UnknownFactor::AccelY, id, solid.mass))
                .with(EquationTerm::constant(solid.mass * self.gravity));

            for (cid, c) in sys.constraints_of(id) {
                let sign = c.sign_for(id);
                x.push(EquationTerm::constraint(UnknownFactor::ForceX, cid, -sign));
                y.push(EquationTerm::constraint(UnknownFactor::ForceY, cid, -sign));
            }

            out.push(x);
            out.push(y);
        }
    }
}

/// Moment balance about each solid's center of mass
pub struct MomentBalance;

impl EquationSource for MomentBalance {
    fn equations(&self, sys: &System, out: &mut Vec<Equation>) {
        for id in sys.solid_ids() {
            let solid = sys.solid(id);

            // Izz α - Σ ±(GP × F)z = 0, with (GP × F)z = GPx Fy - GPy Fx
            let mut eq = Equation::new(format!("moment of {}", solid.name))
                .with(EquationTerm::solid(UnknownFactor::AngularAccel, id, solid.inertia_zz()));

            for (cid, c) in sys.constraints_of(id) {
                let sign = c.sign_for(id);
                let gp = lever_for(sys, c, id);
                eq.push(EquationTerm::constraint(UnknownFactor::ForceX, cid, sign * gp.y));
                eq.push(EquationTerm::constraint(UnknownFactor::ForceY, cid, -sign * gp.x));
            }

            out.push(eq);
        }
    }
}

/// Acceleration-level continuity at each constraint
pub struct ConstraintKinematics;

impl ConstraintKinematics {
    /// Append `sign * (a_G + α ẑ×GP + ω×(ω×GP))` projected on `dir`
    fn push_point_accel(eq: &mut Equation, sys: &System, solid: SolidId, gp: &NVec3, dir: &NVec3, sign: f64) {
        let body = sys.solid(solid);
        eq.push(EquationTerm::solid(UnknownFactor::AccelX, solid, sign * dir.x));
        eq.push(EquationTerm::solid(UnknownFactor::AccelY, solid, sign * dir.y));
        eq.push(EquationTerm::solid(UnknownFactor::AngularAccel, solid, sign * dir.dot(&perp(gp))));
        eq.push(EquationTerm::constant(sign * dir.dot(&body.centripetal_at(gp))));
    }

    fn pivot(sys: &System, cid: ConstraintId, c: &Constraint, out: &mut Vec<Equation>) {
        let gp1 = sys.solid(c.object1.solid).lever_arm(&c.object1.position);
        let gp2 = c.object2.map(|a| (a.solid, sys.solid(a.solid).lever_arm(&a.position)));

        // a_P via object1 - a_P via object2 = 0 (object2 side is 0 on ground)
        for (axis, dir) in [("x", NVec3::x()), ("y", NVec3::y())] {
            let mut eq = Equation::new(format!("pivot {} {} ({})", c.name, axis, cid));
            Self::push_point_accel(&mut eq, sys, c.object1.solid, &gp1, &dir, 1.0);
            if let Some((s2, gp2)) = &gp2 {
                Self::push_point_accel(&mut eq, sys, *s2, gp2, &dir, -1.0);
            }
            out.push(eq);
        }
    }

    fn slider(sys: &System, cid: ConstraintId, c: &Constraint, axis: &NVec3, out: &mut Vec<Equation>) {
        let (u, n) = slider_frame(sys, c, axis);
        let body1 = sys.solid(c.object1.solid);
        let gp1 = body1.lever_arm(&c.object1.position);

        let mut eq = Equation::new(format!("slider {} normal ({})", c.name, cid));
        Self::push_point_accel(&mut eq, sys, c.object1.solid, &gp1, &n, 1.0);

        if let Some(a2) = &c.object2 {
            // second derivative of n·(P1 - Q) with n and Q turning with object2:
            // n·(aP1 - aQ) - α2 (u·d) - 2 ω2 (u·ḋ) - ω2² (n·d) = 0
            let body2 = sys.solid(a2.solid);
            let gq = body2.lever_arm(&a2.position);
            let d = (body1.position + gp1) - (body2.position + gq);
            let d_dot = body1.velocity_at(&gp1) - body2.velocity_at(&gq);
            let w2 = body2.rotational_speed.z;

            Self::push_point_accel(&mut eq, sys, a2.solid, &gq, &n, -1.0);
            eq.push(EquationTerm::solid(UnknownFactor::AngularAccel, a2.solid, -u.dot(&d)));
            eq.push(EquationTerm::constant(-2.0 * w2 * u.dot(&d_dot) - w2 * w2 * n.dot(&d)));
        }

        out.push(eq);
    }
}

impl EquationSource for ConstraintKinematics {
    fn equations(&self, sys: &System, out: &mut Vec<Equation>) {
        for (cid, c) in sys.active_constraints() {
            match &c.kind {
                ConstraintKind::Pivot => Self::pivot(sys, cid, c, out),
                ConstraintKind::Slider { axis } => Self::slider(sys, cid, c, axis, out),
            }
        }
    }
}

/// Restrictions on what each constraint can transmit
///
/// A slider carries no force along its own axis. Torque needs no row since
/// it never enters the system.
pub struct DegreesOfFreedom;

impl EquationSource for DegreesOfFreedom {
    fn equations(&self, sys: &System, out: &mut Vec<Equation>) {
        for (cid, c) in sys.active_constraints() {
            if let ConstraintKind::Slider { axis } = &c.kind {
                let (u, _) = slider_frame(sys, c, axis);
                out.push(
                    Equation::new(format!("slider {} free axis ({})", c.name, cid))
                        .with(EquationTerm::constraint(UnknownFactor::ForceX, cid, u.x))
                        .with(EquationTerm::constraint(UnknownFactor::ForceY, cid, u.y)),
                );
            }
        }
    }
}
