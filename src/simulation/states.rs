//! Core state types for the planar rigid-body simulation.
//!
//! Defines the entities the engine moves around:
//! - `Solid`       rigid body with mass, inertia and planar pose/velocity
//! - `Constraint`  pivot or slider binding one solid to another or to ground
//! - `System`      arena of solids and constraints plus the current time `t`
//!
//! Solids and constraints are addressed by `SolidId` / `ConstraintId`, plain
//! indices into the arenas. Ids stay valid for the whole run: solids are never
//! destroyed and removed constraints are only flagged inactive.

use std::fmt;

use super::geometry::{along_z, to_world, NMat3, NVec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SolidId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(pub usize);

impl fmt::Display for SolidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solid#{}", self.0)
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// Kinematic part of a solid's state, copied by value around RK4 stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidState {
    pub position: NVec3,
    pub rotation: NVec3,
    pub speed: NVec3,
    pub rotational_speed: NVec3,
}

#[derive(Debug, Clone)]
pub struct Solid {
    pub name: String,
    pub mass: f64,
    pub inertia: NMat3, // only zz is used, motion is planar
    pub position: NVec3, // center of mass, world frame
    pub rotation: NVec3, // heading in z
    pub speed: NVec3,
    pub rotational_speed: NVec3,
    pub acceleration: NVec3,
    pub rotational_acceleration: NVec3,
    pub initial_position: NVec3,
    pub initial_rotation: NVec3,
}

impl Solid {
    pub fn new(name: impl Into<String>, mass: f64, inertia: NMat3, position: NVec3) -> Self {
        Self {
            name: name.into(),
            mass,
            inertia,
            position,
            rotation: NVec3::zeros(),
            speed: NVec3::zeros(),
            rotational_speed: NVec3::zeros(),
            acceleration: NVec3::zeros(),
            rotational_acceleration: NVec3::zeros(),
            initial_position: position,
            initial_rotation: NVec3::zeros(),
        }
    }

    /// Start the solid at heading `angle` instead of 0
    pub fn with_rotation(mut self, angle: f64) -> Self {
        self.rotation = along_z(angle);
        self.initial_rotation = self.rotation;
        self
    }

    /// Moment of inertia about the z axis through the center of mass
    #[inline]
    pub fn inertia_zz(&self) -> f64 {
        self.inertia[(2, 2)]
    }

    /// Body-frame point `local` seen from the center of mass, in world axes
    #[inline]
    pub fn lever_arm(&self, local: &NVec3) -> NVec3 {
        to_world(&self.rotation, local)
    }

    /// World position of body-frame point `local`
    #[inline]
    pub fn point_world(&self, local: &NVec3) -> NVec3 {
        self.position + self.lever_arm(local)
    }

    /// Velocity of the material point whose lever arm is `gp`
    #[inline]
    pub fn velocity_at(&self, gp: &NVec3) -> NVec3 {
        self.speed + self.rotational_speed.cross(gp)
    }

    /// Acceleration part of the material point `gp` that does not depend on
    /// this step's unknowns: ω × (ω × GP)
    #[inline]
    pub fn centripetal_at(&self, gp: &NVec3) -> NVec3 {
        self.rotational_speed.cross(&self.rotational_speed.cross(gp))
    }

    pub fn state(&self) -> SolidState {
        SolidState {
            position: self.position,
            rotation: self.rotation,
            speed: self.speed,
            rotational_speed: self.rotational_speed,
        }
    }

    pub fn set_state(&mut self, state: SolidState) {
        self.position = state.position;
        self.rotation = state.rotation;
        self.speed = state.speed;
        self.rotational_speed = state.rotational_speed;
    }

    /// Zero velocities and accelerations, keep the pose
    pub fn clear_kinematics(&mut self) {
        self.speed = NVec3::zeros();
        self.rotational_speed = NVec3::zeros();
        self.acceleration = NVec3::zeros();
        self.rotational_acceleration = NVec3::zeros();
    }

    /// Back to the pose and rest state the solid was built with
    pub fn restore_initial(&mut self) {
        self.position = self.initial_position;
        self.rotation = self.initial_rotation;
        self.clear_kinematics();
    }
}

/// A body and a point expressed in that body's frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    pub solid: SolidId,
    pub position: NVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Attachment points coincide; removes both translations
    Pivot,
    /// Object1's point stays on a line through object2's point along `axis`
    /// (object2 frame, or world frame when grounded); removes one translation
    Slider { axis: NVec3 },
}

impl ConstraintKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintKind::Pivot => "pivot",
            ConstraintKind::Slider { .. } => "slider",
        }
    }

    /// Scalar kinematic equations the constraint contributes
    pub fn kinematic_rows(&self) -> usize {
        match self {
            ConstraintKind::Pivot => 2,
            ConstraintKind::Slider { .. } => 1,
        }
    }

    /// Load-restriction equations (besides the torque exclusion)
    pub fn dof_rows(&self) -> usize {
        match self {
            ConstraintKind::Pivot => 0,
            ConstraintKind::Slider { .. } => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub object1: Attachment,
    pub object2: Option<Attachment>, // None: tied to ground
    pub force_applied_to_first_object: NVec3,
    pub torque_applied_to_first_object: NVec3,
    pub initial_position: NVec3, // world attachment point when joining the engine
    pub active: bool,
}

impl Constraint {
    fn new(name: impl Into<String>, kind: ConstraintKind, object1: SolidId, object1_position: NVec3) -> Self {
        Self {
            name: name.into(),
            kind,
            object1: Attachment { solid: object1, position: object1_position },
            object2: None,
            force_applied_to_first_object: NVec3::zeros(),
            torque_applied_to_first_object: NVec3::zeros(),
            initial_position: NVec3::zeros(),
            active: true,
        }
    }

    /// Pivot from `object1` at body-frame point `position` to the ground
    pub fn pivot(name: impl Into<String>, object1: SolidId, position: NVec3) -> Self {
        Self::new(name, ConstraintKind::Pivot, object1, position)
    }

    /// Slider keeping `object1`'s point on a line along `axis`
    pub fn slider(name: impl Into<String>, object1: SolidId, position: NVec3, axis: NVec3) -> Self {
        Self::new(name, ConstraintKind::Slider { axis }, object1, position)
    }

    /// Bind the second side to `object2` at its body-frame point `position`
    pub fn with_object2(mut self, object2: SolidId, position: NVec3) -> Self {
        self.object2 = Some(Attachment { solid: object2, position });
        self
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.object2.is_none()
    }

    pub fn involves(&self, solid: SolidId) -> bool {
        self.object1.solid == solid || self.object2.map_or(false, |a| a.solid == solid)
    }

    /// +1 when `solid` is object1, -1 when it is object2: the reaction on
    /// object2 is the opposite of the one on object1
    pub fn sign_for(&self, solid: SolidId) -> f64 {
        if self.object1.solid == solid {
            1.0
        } else {
            -1.0
        }
    }

    pub fn clear_loads(&mut self) {
        self.force_applied_to_first_object = NVec3::zeros();
        self.torque_applied_to_first_object = NVec3::zeros();
    }
}

/// Arena of solids and constraints plus the elapsed time
#[derive(Debug, Clone, Default)]
pub struct System {
    pub solids: Vec<Solid>,
    pub constraints: Vec<Constraint>,
    pub t: f64,
}

impl System {
    pub fn solid(&self, id: SolidId) -> &Solid {
        &self.solids[id.0]
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0]
    }

    pub fn solid_ids(&self) -> impl Iterator<Item = SolidId> + '_ {
        (0..self.solids.len()).map(SolidId)
    }

    /// Constraints currently taking part in assembly, in declaration order
    pub fn active_constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> + '_ {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .map(|(i, c)| (ConstraintId(i), c))
    }

    /// Active constraints touching `solid`
    pub fn constraints_of(&self, solid: SolidId) -> impl Iterator<Item = (ConstraintId, &Constraint)> + '_ {
        self.active_constraints().filter(move |(_, c)| c.involves(solid))
    }

    /// World position of an attachment point
    pub fn attachment_world(&self, a: &Attachment) -> NVec3 {
        self.solid(a.solid).point_world(&a.position)
    }

    pub fn states(&self) -> Vec<SolidState> {
        self.solids.iter().map(Solid::state).collect()
    }

    pub fn restore_states(&mut self, states: &[SolidState]) {
        for (s, st) in self.solids.iter_mut().zip(states.iter()) {
            s.set_state(*st);
        }
    }

    pub fn find_solid(&self, name: &str) -> Option<SolidId> {
        self.solids.iter().position(|s| s.name == name).map(SolidId)
    }

    pub fn find_constraint(&self, name: &str) -> Option<ConstraintId> {
        self.constraints.iter().position(|c| c.name == name).map(ConstraintId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::geometry::{uniform_inertia, vec2};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn lever_arm_follows_heading() {
        let s = Solid::new("bar", 1.0, uniform_inertia(1.0), vec2(1.0, 1.0)).with_rotation(FRAC_PI_2);
        let p = s.point_world(&vec2(2.0, 0.0));
        assert_abs_diff_eq!(p, vec2(1.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn restore_initial_clears_motion() {
        let mut s = Solid::new("bar", 1.0, uniform_inertia(1.0), vec2(0.0, 0.0));
        s.position = vec2(4.0, 4.0);
        s.speed = vec2(1.0, 0.0);
        s.rotational_speed = along_z(2.0);
        s.restore_initial();
        assert_eq!(s.position, vec2(0.0, 0.0));
        assert_eq!(s.speed, NVec3::zeros());
        assert_eq!(s.rotational_speed, NVec3::zeros());
    }

    #[test]
    fn sign_is_opposite_on_object2() {
        let c = Constraint::pivot("p", SolidId(0), vec2(0.0, 0.0)).with_object2(SolidId(1), vec2(0.0, 0.0));
        assert_eq!(c.sign_for(SolidId(0)), 1.0);
        assert_eq!(c.sign_for(SolidId(1)), -1.0);
        assert!(!c.involves(SolidId(2)));
    }
}
